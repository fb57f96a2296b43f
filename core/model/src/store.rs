//! FILENAME: core/model/src/store.rs
//! PURPOSE: The in-memory dataset store shared by all request handlers.
//! CONTEXT: Single-writer / multi-reader over `Arc` snapshots. Readers
//! clone the `Arc` under the read lock and then work lock-free against the
//! snapshot; mutations build the complete replacement dataset before
//! publishing it under the write lock, so a schema transition is never
//! observable half-applied.

use crate::calc::{evaluate_pre_calc, CalculationSpec};
use crate::dataset::{Calculations, Dataset, DatasetSummary};
use crate::error::StoreError;
use crate::table::Table;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Process-wide dataset registry.
#[derive(Debug, Default)]
pub struct DatasetStore {
    datasets: RwLock<HashMap<String, Arc<Dataset>>>,
    next_id: AtomicU64,
}

impl DatasetStore {
    pub fn new() -> Self {
        DatasetStore::default()
    }

    /// Dataset IDs combine a monotone counter (uniqueness for the process
    /// lifetime) with a random token (non-guessability).
    fn allocate_id(&self) -> String {
        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = Uuid::new_v4().simple().to_string();
        format!("ds-{}-{}", sequence, &token[..12])
    }

    /// Registers an uploaded table and returns the published snapshot.
    pub fn put(&self, name: impl Into<String>, table: Table) -> Arc<Dataset> {
        let dataset = Arc::new(Dataset::new(self.allocate_id(), name.into(), table));
        self.datasets
            .write()
            .insert(dataset.id.clone(), Arc::clone(&dataset));
        dataset
    }

    pub fn get(&self, id: &str) -> Result<Arc<Dataset>, StoreError> {
        self.datasets
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownDataset(id.to_string()))
    }

    /// Most recent first.
    pub fn list(&self) -> Vec<DatasetSummary> {
        let guard = self.datasets.read();
        let mut entries: Vec<&Arc<Dataset>> = guard.values().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        entries.iter().map(|d| d.summary()).collect()
    }

    /// Idempotent: deleting an absent dataset is not an error.
    pub fn delete(&self, id: &str) -> bool {
        self.datasets.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.datasets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.read().is_empty()
    }

    /// Replaces the dataset's calculation definitions. Pre-stage columns
    /// are materialized once into the stored table so subsequent pivots do
    /// not re-evaluate them; the filter-value cache starts over because the
    /// schema changed. Returns the new snapshot plus any unknown-placeholder
    /// warnings produced during materialization.
    pub fn update_calculations(
        &self,
        id: &str,
        pre: Vec<CalculationSpec>,
        post: Vec<CalculationSpec>,
    ) -> Result<(Arc<Dataset>, Vec<String>), StoreError> {
        let current = self.get(id)?;

        let mut table = current.table.clone();
        table.drop_calculated_columns();

        let mut warnings = Vec::new();
        for spec in &pre {
            let column = evaluate_pre_calc(&table, spec)?;
            for name in &column.missing {
                warnings.push(format!(
                    "Cálculo '{}': campo '{}' não encontrado; valor 0 aplicado.",
                    spec.name, name
                ));
            }
            table.push_column(column.schema, column.values);
        }

        let replacement = Arc::new(current.with_table(table, Calculations { pre, post }));

        let mut guard = self.datasets.write();
        // The dataset may have been deleted while we materialized.
        if !guard.contains_key(id) {
            return Err(StoreError::UnknownDataset(id.to_string()));
        }
        guard.insert(id.to_string(), Arc::clone(&replacement));
        Ok((replacement, warnings))
    }
}
