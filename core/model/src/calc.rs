//! FILENAME: core/model/src/calc.rs
//! PURPOSE: Calculated-column specifications and pre-stage materialization.
//! CONTEXT: Calculations come in two stages. Pre-stage specs add a derived
//! measure column to the raw table before grouping (materialized here, used
//! both by the store and ephemerally by the pivot planner). Post-stage specs
//! are evaluated by the planner against aggregated result columns and never
//! touch the stored table.

use crate::column::{derive_key, ColumnKind, ColumnSchema};
use crate::table::Table;
use crate::value::CellValue;
use parser::{eval, parse, Scope};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stage at which a calculation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcStage {
    Pre,
    Post,
}

/// A calculated-column definition as sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub stage: CalcStage,
    /// Only "expression" is supported; kept for wire compatibility.
    #[serde(default = "default_operation")]
    pub operation: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    /// Post stage: the synthesized result-column key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_key: Option<String>,
    /// Pre stage: the schema key/label of the new measure column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_field: Option<String>,
}

fn default_operation() -> String {
    "expression".to_string()
}

impl CalculationSpec {
    /// The key the produced column is addressed by.
    pub fn output_key(&self) -> String {
        match self.stage {
            CalcStage::Pre => self
                .result_field
                .as_deref()
                .map(derive_key)
                .unwrap_or_else(|| derive_key(&self.name)),
            CalcStage::Post => self
                .result_key
                .clone()
                .or_else(|| self.id.clone())
                .unwrap_or_else(|| format!("calc::{}", derive_key(&self.name))),
        }
    }

    /// The display label of the produced column.
    pub fn output_label(&self) -> String {
        match self.stage {
            CalcStage::Pre => self
                .result_field
                .clone()
                .unwrap_or_else(|| self.name.clone()),
            CalcStage::Post => self.name.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CalcError {
    #[error("{0}")]
    InvalidExpression(#[from] parser::ParseError),

    #[error("Campo 'resultField' é obrigatório para cálculos pré consulta.")]
    MissingResultField,

    #[error("Operação '{0}' não é suportada.")]
    UnsupportedOperation(String),
}

/// Row-scoped environment: placeholders resolve against column keys (and,
/// as a convenience, exact labels) of the table.
struct RowScope<'a> {
    table: &'a Table,
    row: usize,
}

impl Scope for RowScope<'_> {
    fn contains(&self, name: &str) -> bool {
        self.table.column_by_key_or_label(name).is_some()
    }

    fn resolve(&self, name: &str) -> Option<f64> {
        self.table
            .column_by_key_or_label(name)
            .and_then(|c| c.values.get(self.row))
            .and_then(|v| v.as_number())
    }
}

/// The materialized output of one pre-stage calculation.
pub struct PreCalcColumn {
    pub schema: ColumnSchema,
    pub values: Vec<CellValue>,
    /// Unknown placeholders encountered while evaluating, one entry each.
    pub missing: Vec<String>,
}

/// Evaluates a pre-stage spec over every row of `table`.
pub fn evaluate_pre_calc(table: &Table, spec: &CalculationSpec) -> Result<PreCalcColumn, CalcError> {
    if spec.operation != "expression" {
        return Err(CalcError::UnsupportedOperation(spec.operation.clone()));
    }
    if spec.stage == CalcStage::Pre && spec.result_field.is_none() && spec.name.is_empty() {
        return Err(CalcError::MissingResultField);
    }

    let expr = parse(&spec.expression)?;

    let mut missing = Vec::new();
    let mut values = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let scope = RowScope { table, row };
        let cell = match eval(&expr, &scope, &mut missing) {
            Some(mut value) => {
                if let Some(decimals) = spec.decimals {
                    value = parser::apply_decimals(value, decimals);
                }
                CellValue::Number(value)
            }
            None => CellValue::Absent,
        };
        values.push(cell);
    }

    let mut schema = ColumnSchema::new(spec.output_key(), spec.output_label(), ColumnKind::Real);
    schema.calculated = true;
    schema.is_measure = true;

    Ok(PreCalcColumn {
        schema,
        values,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn spec(expression: &str, result_field: &str) -> CalculationSpec {
        CalculationSpec {
            id: None,
            name: result_field.to_string(),
            stage: CalcStage::Pre,
            operation: "expression".to_string(),
            expression: expression.to_string(),
            decimals: None,
            result_key: None,
            result_field: Some(result_field.to_string()),
        }
    }

    fn units_table() -> Table {
        Table::from_columns(vec![Column::new(
            ColumnSchema::new("units", "units", ColumnKind::Integer),
            vec![
                CellValue::Integer(10),
                CellValue::Integer(5),
                CellValue::Absent,
            ],
        )])
    }

    #[test]
    fn identity_expression_reproduces_the_column() {
        let table = units_table();
        let out = evaluate_pre_calc(&table, &spec("{units}", "copia")).unwrap();
        assert_eq!(out.values[0], CellValue::Number(10.0));
        assert_eq!(out.values[1], CellValue::Number(5.0));
        assert_eq!(out.values[2], CellValue::Absent);
        assert!(out.missing.is_empty());
        assert!(out.schema.calculated);
        assert!(out.schema.is_measure);
    }

    #[test]
    fn unknown_placeholder_yields_zero_and_is_reported() {
        let table = units_table();
        let out = evaluate_pre_calc(&table, &spec("{unidades} + 1", "calc")).unwrap();
        assert_eq!(out.values[0], CellValue::Number(1.0));
        assert_eq!(out.missing, vec!["unidades".to_string()]);
    }

    #[test]
    fn syntax_error_rejects_the_calculation() {
        let table = units_table();
        let err = evaluate_pre_calc(&table, &spec("{units} +", "calc"));
        assert!(matches!(err, Err(CalcError::InvalidExpression(_))));
    }

    #[test]
    fn decimals_round_half_away_from_zero() {
        let table = units_table();
        let out = evaluate_pre_calc(&table, &{
            let mut s = spec("{units} / 4", "quarto");
            s.decimals = Some(1);
            s
        })
        .unwrap();
        assert_eq!(out.values[0], CellValue::Number(2.5));
        assert_eq!(out.values[1], CellValue::Number(1.3));
    }
}
