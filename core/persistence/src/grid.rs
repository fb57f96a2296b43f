//! FILENAME: core/persistence/src/grid.rs
//! PURPOSE: Flattens a pivot result into a rectangular export grid.
//! CONTEXT: Excel and PDF share one pipeline: one header row per
//! column-dimension level, one leading cell per row-dimension level, a
//! trailing per-row total column and a final totals row.

use pivot_engine::{PivotResult, ValueFormat};

/// One cell of the flattened grid.
#[derive(Debug, Clone, PartialEq)]
pub enum GridCell {
    Empty,
    Text(String),
    Number(f64),
}

impl GridCell {
    pub fn from_value(value: Option<f64>) -> GridCell {
        match value {
            Some(v) => GridCell::Number(v),
            None => GridCell::Empty,
        }
    }

    pub fn display(&self) -> String {
        match self {
            GridCell::Empty => String::new(),
            GridCell::Text(s) => s.clone(),
            GridCell::Number(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{}", *v as i64)
                } else {
                    format!("{:.2}", v)
                }
            }
        }
    }
}

/// The flattened, export-ready matrix.
#[derive(Debug, Clone)]
pub struct ExportGrid {
    /// Header rows, one per column-dimension level, full grid width.
    pub header_rows: Vec<Vec<String>>,
    /// Data rows: leading label cells, value cells, trailing row total.
    pub body: Vec<Vec<GridCell>>,
    /// Final totals row, same width as the body rows.
    pub totals: Vec<GridCell>,
    /// Leading label columns.
    pub label_columns: usize,
    /// Whether numeric cells carry the currency format.
    pub currency: bool,
}

impl ExportGrid {
    pub fn width(&self) -> usize {
        self.header_rows
            .first()
            .map(|r| r.len())
            .unwrap_or_else(|| self.totals.len())
    }

    /// Flattens a pivot result.
    pub fn from_pivot(result: &PivotResult) -> ExportGrid {
        let currency = result.value_format == ValueFormat::Currency;

        // Dimensionless summary: one row per measure.
        if result.row_headers.is_empty() && result.column_headers.is_empty() {
            let header_rows = vec![vec!["Medida".to_string(), "Valor".to_string()]];
            let body: Vec<Vec<GridCell>> = result
                .summary_values
                .iter()
                .map(|(measure, value)| {
                    vec![GridCell::Text(measure.clone()), GridCell::from_value(*value)]
                })
                .collect();
            let totals = vec![
                GridCell::Text("Total".to_string()),
                GridCell::from_value(result.grand_total),
            ];
            return ExportGrid {
                header_rows,
                body,
                totals,
                label_columns: 1,
                currency,
            };
        }

        let label_columns = result.rows.len().max(1);
        let depth = result
            .column_headers
            .iter()
            .map(|parts| parts.len())
            .max()
            .unwrap_or(1);
        let width = label_columns + result.column_headers.len() + 1;

        // Header rows: the last level carries the row-dimension labels in
        // its leading cells and "Total" in the trailing cell.
        let mut header_rows = Vec::with_capacity(depth);
        for level in 0..depth {
            let mut row = Vec::with_capacity(width);
            let is_last = level == depth - 1;
            for label_index in 0..label_columns {
                if is_last {
                    row.push(
                        result
                            .rows
                            .get(label_index)
                            .cloned()
                            .unwrap_or_else(|| "Medida".to_string()),
                    );
                } else {
                    row.push(String::new());
                }
            }
            for parts in &result.column_headers {
                row.push(parts.get(level).cloned().unwrap_or_default());
            }
            row.push(if is_last { "Total".to_string() } else { String::new() });
            header_rows.push(row);
        }

        // Body rows.
        let mut body = Vec::with_capacity(result.row_headers.len());
        for (index, header) in result.row_headers.iter().enumerate() {
            let mut row = Vec::with_capacity(width);
            for label_index in 0..label_columns {
                let label = header
                    .get(label_index)
                    .and_then(|part| part.clone())
                    .unwrap_or_default();
                row.push(GridCell::Text(label));
            }
            for value in result.values.get(index).into_iter().flatten() {
                row.push(GridCell::from_value(*value));
            }
            row.push(GridCell::from_value(
                result.row_totals.get(index).copied().flatten(),
            ));
            body.push(row);
        }

        // Totals row.
        let mut totals = Vec::with_capacity(width);
        totals.push(GridCell::Text("Total".to_string()));
        for _ in 1..label_columns {
            totals.push(GridCell::Empty);
        }
        for value in &result.column_totals {
            totals.push(GridCell::from_value(*value));
        }
        totals.push(GridCell::from_value(result.grand_total));

        ExportGrid {
            header_rows,
            body,
            totals,
            label_columns,
            currency,
        }
    }
}

/// Attachment name: dataset name stem plus the current UTC timestamp.
pub fn export_filename(dataset_name: &str, extension: &str) -> String {
    let stem: String = dataset_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(dataset_name)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", stem, timestamp, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{CellValue, Column, ColumnKind, ColumnSchema, Dataset, Table};
    use pivot_engine::{run_pivot, ExecutionGuard, PivotQuery};

    fn sales_result() -> PivotResult {
        let table = Table::from_columns(vec![
            Column::new(
                ColumnSchema::new("region", "region", ColumnKind::Text),
                vec![
                    CellValue::Text("N".into()),
                    CellValue::Text("N".into()),
                    CellValue::Text("S".into()),
                ],
            ),
            Column::new(
                ColumnSchema::new("product", "product", ColumnKind::Text),
                vec![
                    CellValue::Text("A".into()),
                    CellValue::Text("B".into()),
                    CellValue::Text("A".into()),
                ],
            ),
            Column::new(
                ColumnSchema::new("units", "units", ColumnKind::Integer),
                vec![
                    CellValue::Integer(10),
                    CellValue::Integer(5),
                    CellValue::Integer(3),
                ],
            ),
        ]);
        let dataset = Dataset::new("ds-1".into(), "sales.csv".into(), table);
        let query = PivotQuery {
            dataset_id: "ds-1".into(),
            rows: vec!["region".into()],
            columns: vec!["product".into()],
            measures: vec!["units".into()],
            aggregator: "sum".into(),
            ..PivotQuery::default()
        };
        run_pivot(&dataset, &query, &ExecutionGuard::default()).unwrap()
    }

    #[test]
    fn flattened_grid_has_headers_body_and_totals() {
        let grid = ExportGrid::from_pivot(&sales_result());
        assert_eq!(grid.header_rows.len(), 1);
        assert_eq!(
            grid.header_rows[0],
            vec!["region", "A", "B", "Total"]
        );
        assert_eq!(grid.body.len(), 2);
        assert_eq!(grid.body[0][0], GridCell::Text("N".into()));
        assert_eq!(grid.body[0][1], GridCell::Number(10.0));
        assert_eq!(grid.body[0][3], GridCell::Number(15.0));
        assert_eq!(grid.totals[0], GridCell::Text("Total".into()));
        assert_eq!(grid.totals[3], GridCell::Number(18.0));
    }

    #[test]
    fn filenames_carry_the_stem_and_timestamp() {
        let name = export_filename("vendas 2025.csv", "xlsx");
        assert!(name.starts_with("vendas_2025_"));
        assert!(name.ends_with(".xlsx"));
    }
}
