//! FILENAME: core/pivot-engine/src/view.rs
//! PURPOSE: The materialized pivot result sent back to clients.
//! CONTEXT: Everything here is plain data: the planner fills it in, the
//! HTTP facade serializes it, and the exporter flattens it into a grid.

use crate::definition::{ValueFormat, EMPTY_CELL_LABEL};
use model::Calculations;
use serde::Serialize;
use std::collections::BTreeMap;

/// The complete pivot response envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotResult {
    pub dataset_id: String,

    /// Echo of the queried dimensions.
    pub rows: Vec<String>,
    pub columns: Vec<String>,

    /// Primary measure (first of `measures`), kept for older clients.
    pub measure: Option<String>,
    pub measures: Vec<String>,
    pub aggregator: String,

    /// One tuple per result row; absent grouping values serialize as null.
    pub row_headers: Vec<Vec<Option<String>>>,

    /// One display tuple per visible column, sentinel-substituted and, when
    /// more than one measure is selected, prefixed with the measure label.
    pub column_headers: Vec<Vec<String>>,

    /// Stable keys aligned with `column_headers`; post-calculation columns
    /// are appended here as well.
    pub column_keys: Vec<String>,

    /// Row-major numeric matrix; absent aggregates serialize as null.
    pub values: Vec<Vec<Option<f64>>>,

    pub row_totals: Vec<Option<f64>>,
    pub column_totals: Vec<Option<f64>>,
    pub grand_total: Option<f64>,

    /// Set when the query had no row and no column dimensions.
    pub summary_value: Option<f64>,
    /// Per-measure summary aggregates for the dimensionless case.
    pub summary_values: BTreeMap<String, Option<f64>>,

    /// Echo of the applied calculation definitions.
    pub calculations: Calculations,

    pub value_format: ValueFormat,

    /// Non-fatal degradations: unknown placeholders, soft-deadline overrun.
    pub warnings: Vec<String>,
}

impl PivotResult {
    /// Display form of one header part: absent becomes the sentinel.
    pub fn display_part(part: &Option<String>) -> String {
        part.clone().unwrap_or_else(|| EMPTY_CELL_LABEL.to_string())
    }

    /// Flattens one column-header tuple for exports and post-calculation
    /// label lookup ("2024 / Janeiro").
    pub fn flatten_header(parts: &[String]) -> String {
        if parts.is_empty() {
            "Total".to_string()
        } else {
            parts.join(" / ")
        }
    }
}
