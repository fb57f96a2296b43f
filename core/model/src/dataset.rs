//! FILENAME: core/model/src/dataset.rs
//! PURPOSE: An uploaded table plus its derived metadata and caches.
//! CONTEXT: Datasets are immutable snapshots shared behind `Arc`; the only
//! interior mutability is the memoized filter-value index, which is a pure
//! cache over immutable data.

use crate::calc::CalculationSpec;
use crate::collate;
use crate::column::ColumnSchema;
use crate::error::StoreError;
use crate::table::Table;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Listing entry for dataset pickers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
}

/// Persisted calculation definitions, split by stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Calculations {
    #[serde(default)]
    pub pre: Vec<CalculationSpec>,
    #[serde(default)]
    pub post: Vec<CalculationSpec>,
}

/// Key/label pair for post-calculation columns addressable in expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostColumnRef {
    pub key: String,
    pub label: String,
}

/// An uploaded table with schema, calculations and the filter-value cache.
#[derive(Debug)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub table: Table,
    pub calculations: Calculations,
    filter_values: Mutex<HashMap<String, Arc<Vec<String>>>>,
}

impl Dataset {
    pub fn new(id: String, name: String, table: Table) -> Self {
        Dataset {
            id,
            name,
            created_at: Utc::now(),
            table,
            calculations: Calculations::default(),
            filter_values: Mutex::new(HashMap::new()),
        }
    }

    /// Rebuilds the dataset around a new table (used by the store when
    /// calculations are re-materialized). The filter cache starts empty.
    pub fn with_table(&self, table: Table, calculations: Calculations) -> Self {
        Dataset {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            table,
            calculations,
            filter_values: Mutex::new(HashMap::new()),
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn schema(&self) -> Vec<ColumnSchema> {
        self.table.schema()
    }

    /// Column keys usable as grouping dimensions.
    pub fn dimensions(&self) -> Vec<String> {
        self.table
            .columns()
            .iter()
            .filter(|c| !c.schema.is_measure)
            .map(|c| c.schema.key.clone())
            .collect()
    }

    /// Column keys usable as measures. Falls back to every column when the
    /// upload had no numeric columns at all, mirroring the lenient behavior
    /// of the workbench UI.
    pub fn measures(&self) -> Vec<String> {
        let measures: Vec<String> = self
            .table
            .columns()
            .iter()
            .filter(|c| c.schema.is_measure)
            .map(|c| c.schema.key.clone())
            .collect();
        if measures.is_empty() {
            self.table
                .columns()
                .iter()
                .map(|c| c.schema.key.clone())
                .collect()
        } else {
            measures
        }
    }

    /// Display labels of the measure columns (currency-format heuristics
    /// look at labels, not keys).
    pub fn measure_labels(&self) -> Vec<String> {
        self.table
            .columns()
            .iter()
            .filter(|c| c.schema.is_measure)
            .map(|c| c.schema.label.clone())
            .collect()
    }

    /// Post-calculation columns addressable from later expressions.
    pub fn available_post_columns(&self) -> Vec<PostColumnRef> {
        self.calculations
            .post
            .iter()
            .map(|spec| PostColumnRef {
                key: spec.output_key(),
                label: spec.output_label(),
            })
            .collect()
    }

    /// The sorted distinct stringified values of one column, memoized.
    /// Absent cells are omitted; ordering is pt-BR collation.
    pub fn filter_values(&self, key: &str) -> Result<Arc<Vec<String>>, StoreError> {
        if let Some(cached) = self.filter_values.lock().get(key) {
            return Ok(Arc::clone(cached));
        }

        let column = self
            .table
            .column(key)
            .ok_or_else(|| StoreError::UnknownColumn(key.to_string()))?;

        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for cell in &column.values {
            if let Some(text) = cell.as_filter_string() {
                if seen.insert(text.clone()) {
                    values.push(text);
                }
            }
        }
        collate::sort_values(&mut values);

        let shared = Arc::new(values);
        self.filter_values
            .lock()
            .insert(key.to_string(), Arc::clone(&shared));
        Ok(shared)
    }
}
