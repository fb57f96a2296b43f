//! FILENAME: core/model/src/table.rs
//! PURPOSE: Column-oriented in-memory tables.
//! CONTEXT: A table is an ordered sequence of columns; each column owns a
//! dense vector of values and its schema entry. Rows exist only as indexes.

use crate::column::ColumnSchema;
use crate::value::CellValue;

/// One column: schema entry plus a dense value vector.
#[derive(Debug, Clone)]
pub struct Column {
    pub schema: ColumnSchema,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(schema: ColumnSchema, values: Vec<CellValue>) -> Self {
        Column { schema, values }
    }
}

/// An ordered set of equally long columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    /// Builds a table from columns, padding short vectors with `Absent` so
    /// every column has the same length.
    pub fn from_columns(mut columns: Vec<Column>) -> Self {
        let row_count = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
        for column in &mut columns {
            column.values.resize(row_count, CellValue::Absent);
        }
        Table { columns, row_count }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.schema.key == key)
    }

    pub fn contains_column(&self, key: &str) -> bool {
        self.column(key).is_some()
    }

    /// Resolves a column by key first, then by exact label. Calculated
    /// columns are often addressed by their display name.
    pub fn column_by_key_or_label(&self, name: &str) -> Option<&Column> {
        self.column(name)
            .or_else(|| self.columns.iter().find(|c| c.schema.label == name))
    }

    pub fn value(&self, row: usize, key: &str) -> Option<&CellValue> {
        self.column(key).and_then(|c| c.values.get(row))
    }

    pub fn schema(&self) -> Vec<ColumnSchema> {
        self.columns.iter().map(|c| c.schema.clone()).collect()
    }

    /// Appends a column. The vector is padded or truncated to the current
    /// row count; on an empty table the column defines the row count.
    pub fn push_column(&mut self, schema: ColumnSchema, mut values: Vec<CellValue>) {
        if self.columns.is_empty() {
            self.row_count = values.len();
        } else {
            values.resize(self.row_count, CellValue::Absent);
        }
        self.columns.push(Column::new(schema, values));
    }

    /// Removes every column flagged as calculated, returning the base table
    /// shape that uploads produced.
    pub fn drop_calculated_columns(&mut self) {
        self.columns.retain(|c| !c.schema.calculated);
    }

    /// Builds a new table containing only the given row indexes, in order.
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let values = rows
                    .iter()
                    .map(|&row| column.values.get(row).cloned().unwrap_or(CellValue::Absent))
                    .collect();
                Column::new(column.schema.clone(), values)
            })
            .collect();
        Table {
            columns,
            row_count: rows.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnKind, ColumnSchema};

    fn text(v: &str) -> CellValue {
        CellValue::Text(v.to_string())
    }

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::new(
                ColumnSchema::new("region", "region", ColumnKind::Text),
                vec![text("N"), text("N"), text("S")],
            ),
            Column::new(
                ColumnSchema::new("units", "units", ColumnKind::Integer),
                vec![
                    CellValue::Integer(10),
                    CellValue::Integer(5),
                    CellValue::Integer(3),
                ],
            ),
        ])
    }

    #[test]
    fn from_columns_pads_ragged_vectors() {
        let table = Table::from_columns(vec![
            Column::new(
                ColumnSchema::new("a", "a", ColumnKind::Text),
                vec![text("x")],
            ),
            Column::new(
                ColumnSchema::new("b", "b", ColumnKind::Text),
                vec![text("y"), text("z")],
            ),
        ]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.value(1, "a"), Some(&CellValue::Absent));
    }

    #[test]
    fn take_rows_preserves_order_and_schema() {
        let table = sample();
        let subset = table.take_rows(&[2, 0]);
        assert_eq!(subset.row_count(), 2);
        assert_eq!(subset.value(0, "region"), Some(&text("S")));
        assert_eq!(subset.value(1, "units"), Some(&CellValue::Integer(10)));
        assert_eq!(subset.schema().len(), 2);
    }

    #[test]
    fn calculated_columns_can_be_dropped() {
        let mut table = sample();
        let mut schema = ColumnSchema::new("dobro", "dobro", ColumnKind::Real);
        schema.calculated = true;
        table.push_column(schema, vec![CellValue::Number(20.0); 3]);
        assert_eq!(table.column_count(), 3);
        table.drop_calculated_columns();
        assert_eq!(table.column_count(), 2);
    }
}
