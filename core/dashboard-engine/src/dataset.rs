//! FILENAME: core/dashboard-engine/src/dataset.rs
//! PURPOSE: The normalized contracts dataset and its query filters.
//! CONTEXT: A contracts dataset is the dashboard-side sibling of
//! `model::Dataset`: an immutable snapshot of normalized rows plus month
//! metadata, the original rows kept for the raw-data panel, and the label
//! map resolved during normalization.

use crate::columns::MonthInfo;
use crate::error::DashboardError;
use crate::normalize::{distinct_values, normalize_table, ContractRow};
use chrono::{DateTime, NaiveDate, Utc};
use model::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many original rows ride along for the raw-data panel.
const RAW_ROW_LIMIT: usize = 200;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContractsSummary {
    pub id: String,
    pub name: String,
}

/// A normalized contracts workbook.
#[derive(Debug)]
pub struct ContractsDataset {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub rows: Vec<ContractRow>,
    pub months: Vec<MonthInfo>,
    pub warnings: Vec<String>,
    pub column_map: BTreeMap<String, String>,
    /// First rows of the original table, serialized for the raw panel.
    pub raw_rows: Vec<serde_json::Value>,
    pub raw_columns: Vec<String>,
}

impl ContractsDataset {
    pub fn from_table(
        id: String,
        name: String,
        table: &Table,
        today: NaiveDate,
    ) -> Result<Self, DashboardError> {
        let normalized = normalize_table(table, today)?;

        let raw_columns: Vec<String> = table
            .columns()
            .iter()
            .map(|c| c.schema.label.clone())
            .collect();
        let raw_rows: Vec<serde_json::Value> = (0..table.row_count().min(RAW_ROW_LIMIT))
            .map(|row| {
                let mut object = serde_json::Map::new();
                for column in table.columns() {
                    object.insert(
                        column.schema.label.clone(),
                        column.values[row].to_json(),
                    );
                }
                serde_json::Value::Object(object)
            })
            .collect();

        Ok(ContractsDataset {
            id,
            name,
            created_at: Utc::now(),
            rows: normalized.rows,
            months: normalized.months,
            warnings: normalized.warnings,
            column_map: normalized.column_map,
            raw_rows,
            raw_columns,
        })
    }

    pub fn summary(&self) -> ContractsSummary {
        ContractsSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Distinct values per filterable dimension.
    pub fn filter_values(&self) -> FilterValues {
        FilterValues {
            ugr: distinct_values(&self.rows, |r| &r.ugr),
            pi: distinct_values(&self.rows, |r| &r.pi),
            descricao: distinct_values(&self.rows, |r| &r.descricao),
            status: distinct_values(&self.rows, |r| &r.status),
            cnpj: distinct_values(&self.rows, |r| &r.cnpj),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterValues {
    pub ugr: Vec<String>,
    pub pi: Vec<String>,
    pub descricao: Vec<String>,
    pub status: Vec<String>,
    pub cnpj: Vec<String>,
}

/// Allow-set filters of a dashboard query. Matching is case-insensitive;
/// empty lists mean "no restriction" here (unlike the pivot filters, these
/// come from multi-select widgets that omit untouched dimensions).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DashboardFilters {
    #[serde(default)]
    pub ugr: Vec<String>,
    #[serde(default)]
    pub pi: Vec<String>,
    #[serde(default)]
    pub descricao: Vec<String>,
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub cnpj: Vec<String>,
    /// Month keys (`month_2025_03`) restricting the monthly series.
    #[serde(default)]
    pub month: Vec<String>,
}

impl DashboardFilters {
    pub fn apply(&self, rows: &[ContractRow]) -> Vec<ContractRow> {
        rows.iter()
            .filter(|row| {
                matches_set(&self.ugr, &row.ugr)
                    && matches_set(&self.pi, &row.pi)
                    && matches_set(&self.descricao, &row.descricao)
                    && matches_set(&self.status, &row.status)
                    && matches_set(&self.cnpj, &row.cnpj)
            })
            .cloned()
            .collect()
    }

    /// Restricts month metadata to the selected keys (all when empty).
    pub fn active_months(&self, months: &[MonthInfo]) -> Vec<MonthInfo> {
        if self.month.is_empty() {
            return months.to_vec();
        }
        months
            .iter()
            .filter(|info| self.month.contains(&info.key))
            .cloned()
            .collect()
    }
}

fn matches_set(allowed: &[String], value: &str) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let lowered = value.trim().to_lowercase();
    allowed.iter().any(|v| v.trim().to_lowercase() == lowered)
}
