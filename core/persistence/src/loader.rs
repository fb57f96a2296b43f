//! FILENAME: core/persistence/src/loader.rs
//! PURPOSE: Turns uploaded bytes plus a filename into a typed Table.
//! CONTEXT: The filename only selects the decoder; every decoder produces
//! the same raw string grid, which then goes through header promotion, key
//! allocation and type inference.

use crate::delimited;
use crate::error::LoadError;
use crate::infer::{infer_kind, typed_cell};
use crate::json;
use crate::spreadsheet;
use model::{normalize_label, Column, ColumnSchema, KeyAllocator, Table};
use std::collections::HashSet;

/// Untyped decoder output: one header row plus data rows of strings.
#[derive(Debug, Default, Clone)]
pub struct RawGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Loads an uploaded file into a typed table.
pub fn load_table(filename: &str, content: &[u8]) -> Result<Table, LoadError> {
    if filename.trim().is_empty() {
        return Err(LoadError::UnsupportedFormat("(sem nome)".to_string()));
    }

    let extension = filename
        .rsplit('.')
        .next()
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let grid = match extension.as_str() {
        "csv" | "tsv" | "txt" => delimited::read_grid(content),
        "json" => json::read_grid(content)?,
        "xls" | "xlsx" => spreadsheet::read_grid(content)?,
        other => return Err(LoadError::UnsupportedFormat(format!(".{}", other))),
    };

    build_table(grid)
}

/// Builds the typed table: promote a better header row if the decoded one
/// is mostly placeholders, normalize labels, allocate keys, infer kinds.
pub fn build_table(grid: RawGrid) -> Result<Table, LoadError> {
    let grid = promote_header_if_needed(grid);

    if grid.rows.is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let labels: Vec<String> = grid
        .headers
        .iter()
        .map(|raw| normalize_label(raw))
        .collect();
    let column_count = labels.len().max(
        grid.rows
            .iter()
            .map(|row| row.len())
            .max()
            .unwrap_or(0),
    );

    let mut allocator = KeyAllocator::new();
    let mut keys = Vec::with_capacity(column_count);
    let mut final_labels = Vec::with_capacity(column_count);
    for position in 0..column_count {
        let label = labels.get(position).cloned().unwrap_or_default();
        let key = allocator.allocate(&label, position);
        let label = if label.is_empty() {
            key.clone()
        } else {
            label
        };
        keys.push(key);
        final_labels.push(label);
    }

    let mut seen = HashSet::new();
    for key in &keys {
        if !seen.insert(key.clone()) {
            return Err(LoadError::SchemaConflict(key.clone()));
        }
    }

    let mut columns = Vec::with_capacity(column_count);
    for position in 0..column_count {
        let raw_cells: Vec<String> = grid
            .rows
            .iter()
            .map(|row| row.get(position).cloned().unwrap_or_default())
            .collect();
        let kind = infer_kind(&raw_cells);
        let values = raw_cells
            .iter()
            .map(|raw| typed_cell(raw, kind))
            .collect();
        let schema = ColumnSchema::new(keys[position].clone(), final_labels[position].clone(), kind);
        columns.push(Column::new(schema, values));
    }

    Ok(Table::from_columns(columns))
}

/// When at least half the decoded headers are placeholders ("", "Unnamed"),
/// the real header is usually a few rows down; scan the first five data
/// rows for one where at least half the cells are non-empty and promote it.
fn promote_header_if_needed(grid: RawGrid) -> RawGrid {
    let total = grid.headers.len();
    if total == 0 {
        return grid;
    }
    let placeholders = grid
        .headers
        .iter()
        .filter(|h| is_placeholder_header(h))
        .count();
    if placeholders < (total / 2).max(1) {
        return grid;
    }

    let required = ((total as f64) * 0.5).ceil() as usize;
    let scan_limit = grid.rows.len().min(5);
    for index in 0..scan_limit {
        let non_empty = grid.rows[index]
            .iter()
            .filter(|c| !c.trim().is_empty())
            .count();
        if non_empty >= required.max(1) {
            let headers = grid.rows[index].clone();
            let rows = grid.rows[index + 1..].to_vec();
            return RawGrid { headers, rows };
        }
    }
    grid
}

fn is_placeholder_header(header: &str) -> bool {
    let text = header.trim().to_lowercase();
    text.is_empty() || text.starts_with("unnamed")
}
