//! FILENAME: core/pivot-engine/src/tests.rs
//! PURPOSE: Consolidated unit tests for the pivot engine.

use crate::definition::{aggregation_options, PivotError, PivotQuery, ValueFormat};
use crate::engine::run_pivot;
use crate::guard::{CancelHandle, ExecutionGuard};
use crate::view::PivotResult;
use model::{
    CalcStage, CalculationSpec, CellValue, Column, ColumnKind, ColumnSchema, Dataset, Table,
};
use std::collections::HashMap;

// ============================================================================
// FIXTURES
// ============================================================================

/// The three-row sales table used across the scenarios:
/// region,product,units / N,A,10 / N,B,5 / S,A,3
fn sales_dataset() -> Dataset {
    let table = Table::from_columns(vec![
        Column::new(
            ColumnSchema::new("region", "region", ColumnKind::Text),
            vec![text("N"), text("N"), text("S")],
        ),
        Column::new(
            ColumnSchema::new("product", "product", ColumnKind::Text),
            vec![text("A"), text("B"), text("A")],
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
    Dataset::new("ds-1-test".into(), "sales.csv".into(), table)
}

fn text(v: &str) -> CellValue {
    CellValue::Text(v.to_string())
}

fn query(rows: &[&str], columns: &[&str], measures: &[&str], aggregator: &str) -> PivotQuery {
    PivotQuery {
        dataset_id: "ds-1-test".into(),
        rows: rows.iter().map(|s| s.to_string()).collect(),
        columns: columns.iter().map(|s| s.to_string()).collect(),
        measures: measures.iter().map(|s| s.to_string()).collect(),
        aggregator: aggregator.to_string(),
        ..PivotQuery::default()
    }
}

fn run(dataset: &Dataset, query: &PivotQuery) -> Result<PivotResult, PivotError> {
    run_pivot(dataset, query, &ExecutionGuard::default())
}

fn cell(result: &PivotResult, row: usize, col: usize) -> f64 {
    result.values[row][col].unwrap()
}

// ============================================================================
// SCENARIOS S1-S4
// ============================================================================

#[test]
fn s1_basic_pivot() {
    let dataset = sales_dataset();
    let result = run(&dataset, &query(&["region"], &["product"], &["units"], "sum")).unwrap();

    assert_eq!(result.column_headers, vec![vec!["A"], vec!["B"]]);
    assert_eq!(
        result.row_headers,
        vec![vec![Some("N".to_string())], vec![Some("S".to_string())]]
    );
    assert_eq!(cell(&result, 0, 0), 10.0);
    assert_eq!(cell(&result, 0, 1), 5.0);
    assert_eq!(cell(&result, 1, 0), 3.0);
    assert_eq!(cell(&result, 1, 1), 0.0);
    assert_eq!(result.row_totals, vec![Some(15.0), Some(3.0)]);
    assert_eq!(result.column_totals, vec![Some(13.0), Some(5.0)]);
    assert_eq!(result.grand_total, Some(18.0));
    assert_eq!(result.value_format, ValueFormat::Number);
    assert!(result.warnings.is_empty());
}

#[test]
fn s2_post_calculation_share() {
    let dataset = sales_dataset();
    let mut q = query(&["region"], &["product"], &["units"], "sum");
    q.post_calculations.push(CalculationSpec {
        id: None,
        name: "share".into(),
        stage: CalcStage::Post,
        operation: "expression".into(),
        expression: "{units}/{units} * 100".into(),
        decimals: None,
        result_key: Some("calc_share".into()),
        result_field: None,
    });
    let result = run(&dataset, &q).unwrap();

    // Two measure columns plus one calculated counterpart per column.
    assert_eq!(result.column_headers.len(), 4);
    assert_eq!(result.column_headers[2], vec!["share (A)"]);
    assert_eq!(result.column_headers[3], vec!["share (B)"]);

    // Non-zero source cells yield 100, the empty (S,B) cell yields 0.
    assert_eq!(cell(&result, 0, 2), 100.0);
    assert_eq!(cell(&result, 0, 3), 100.0);
    assert_eq!(cell(&result, 1, 2), 100.0);
    assert_eq!(cell(&result, 1, 3), 0.0);
    assert!(result.warnings.is_empty());
}

#[test]
fn s3_filter() {
    let dataset = sales_dataset();
    let mut q = query(&["region"], &["product"], &["units"], "sum");
    q.filters = HashMap::from([("region".to_string(), vec!["N".to_string()])]);
    let result = run(&dataset, &q).unwrap();

    assert_eq!(result.values, vec![vec![Some(10.0), Some(5.0)]]);
    assert_eq!(result.row_totals, vec![Some(15.0)]);
    assert_eq!(result.grand_total, Some(15.0));
}

#[test]
fn s4_aggregator_switch_to_avg() {
    let dataset = sales_dataset();
    let result = run(&dataset, &query(&["region"], &[], &["units"], "avg")).unwrap();

    assert_eq!(result.row_totals, vec![Some(7.5), Some(3.0)]);
    assert_eq!(result.grand_total, Some(6.0));
    // Without column dimensions the single measure is the only column.
    assert_eq!(result.column_headers, vec![vec!["units"]]);
}

// ============================================================================
// INVARIANTS
// ============================================================================

#[test]
fn additive_totals_are_consistent() {
    let dataset = sales_dataset();
    let result = run(&dataset, &query(&["region"], &["product"], &["units"], "sum")).unwrap();

    let row_sum: f64 = result.row_totals.iter().filter_map(|v| *v).sum();
    let col_sum: f64 = result.column_totals.iter().filter_map(|v| *v).sum();
    let grand = result.grand_total.unwrap();
    assert!((grand - row_sum).abs() < 1e-6 * grand.abs().max(1.0));
    assert!((grand - col_sum).abs() < 1e-6 * grand.abs().max(1.0));
}

#[test]
fn summary_pivot_equals_column_sum() {
    let dataset = sales_dataset();
    let result = run(&dataset, &query(&[], &[], &["units"], "sum")).unwrap();

    assert_eq!(result.grand_total, Some(18.0));
    assert_eq!(result.summary_value, Some(18.0));
    assert_eq!(result.summary_values.get("units"), Some(&Some(18.0)));
    assert!(result.values.is_empty());
}

#[test]
fn non_additive_row_totals_come_from_source_rows() {
    // With avg, the row total must be the mean over the underlying rows,
    // not the mean (or sum) of the visible cells.
    let dataset = sales_dataset();
    let result = run(&dataset, &query(&["region"], &["product"], &["units"], "avg")).unwrap();

    // Region N has rows 10 and 5: mean 7.5. The visible cells are 10 and 5.
    assert_eq!(result.row_totals[0], Some(7.5));
    // The (S,B) intersection has no rows: absent under avg.
    assert_eq!(result.values[1][1], None);
    // Grand total is the mean over all three source rows.
    assert_eq!(result.grand_total, Some(6.0));
}

#[test]
fn identity_pre_calculation_matches_source_column() {
    let dataset = sales_dataset();
    let mut q = query(&["region"], &[], &["copia"], "sum");
    q.pre_calculations.push(CalculationSpec {
        id: None,
        name: "copia".into(),
        stage: CalcStage::Pre,
        operation: "expression".into(),
        expression: "{units}".into(),
        decimals: None,
        result_key: None,
        result_field: Some("copia".into()),
    });
    let result = run(&dataset, &q).unwrap();

    let baseline = run(&dataset, &query(&["region"], &[], &["units"], "sum")).unwrap();
    assert_eq!(result.values, baseline.values);
    assert_eq!(result.grand_total, baseline.grand_total);
    assert!(result.warnings.is_empty());
}

// ============================================================================
// BOUNDARY BEHAVIOR
// ============================================================================

#[test]
fn empty_allow_set_filters_everything_out() {
    let dataset = sales_dataset();
    let mut q = query(&["region"], &["product"], &["units"], "sum");
    q.filters = HashMap::from([("region".to_string(), Vec::new())]);
    let result = run(&dataset, &q).unwrap();

    assert!(result.values.is_empty());
    assert_eq!(result.grand_total, Some(0.0));

    q.aggregator = "avg".into();
    let result = run(&dataset, &q).unwrap();
    assert_eq!(result.grand_total, None);
}

#[test]
fn seven_measures_are_rejected() {
    let dataset = sales_dataset();
    let measures: Vec<String> = (0..7).map(|i| format!("m{}", i)).collect();
    let mut q = query(&["region"], &[], &[], "sum");
    q.measures = measures;
    assert!(matches!(
        run(&dataset, &q),
        Err(PivotError::TooManyMeasures(7))
    ));
}

#[test]
fn missing_measure_and_unknown_names_are_rejected() {
    let dataset = sales_dataset();
    assert!(matches!(
        run(&dataset, &query(&["region"], &[], &[], "sum")),
        Err(PivotError::NoMeasure)
    ));
    assert!(matches!(
        run(&dataset, &query(&["region"], &[], &["units"], "median")),
        Err(PivotError::UnknownAggregator(_))
    ));
    assert!(matches!(
        run(&dataset, &query(&["ghost"], &[], &["units"], "sum")),
        Err(PivotError::UnknownColumn(_))
    ));
    assert!(matches!(
        run(&dataset, &query(&["region"], &[], &["ghost"], "sum")),
        Err(PivotError::UnknownColumn(_))
    ));
}

#[test]
fn invalid_post_expression_is_rejected() {
    let dataset = sales_dataset();
    let mut q = query(&["region"], &["product"], &["units"], "sum");
    q.post_calculations.push(CalculationSpec {
        id: None,
        name: "broken".into(),
        stage: CalcStage::Post,
        operation: "expression".into(),
        expression: "{units} +".into(),
        decimals: None,
        result_key: None,
        result_field: None,
    });
    assert!(matches!(
        run(&dataset, &q),
        Err(PivotError::InvalidExpression(_))
    ));
}

#[test]
fn unknown_post_placeholder_degrades_with_warning() {
    let dataset = sales_dataset();
    let mut q = query(&["region"], &["product"], &["units"], "sum");
    q.post_calculations.push(CalculationSpec {
        id: None,
        name: "calc".into(),
        stage: CalcStage::Post,
        operation: "expression".into(),
        expression: "{fantasma} + 1".into(),
        decimals: None,
        result_key: Some("calc_x".into()),
        result_field: None,
    });
    let result = run(&dataset, &q).unwrap();
    // Appended column exists, every cell 1, and the warning names the field.
    let last = result.values[0].len() - 1;
    assert_eq!(result.values[0][last], Some(1.0));
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("fantasma"));
}

#[test]
fn absent_group_values_use_the_sentinel_and_sort_last() {
    let table = Table::from_columns(vec![
        Column::new(
            ColumnSchema::new("grupo", "grupo", ColumnKind::Text),
            vec![text("B"), CellValue::Absent, text("A")],
        ),
        Column::new(
            ColumnSchema::new("valor_gasto", "Valor gasto", ColumnKind::Real),
            vec![
                CellValue::Number(1.0),
                CellValue::Number(2.0),
                CellValue::Number(4.0),
            ],
        ),
    ]);
    let dataset = Dataset::new("ds-2-test".into(), "x.csv".into(), table);
    let result = run(
        &dataset,
        &query(&[], &["grupo"], &["valor_gasto"], "sum"),
    )
    .unwrap();

    assert_eq!(
        result.column_headers,
        vec![
            vec!["A".to_string()],
            vec!["B".to_string()],
            vec!["Células Vazias".to_string()],
        ]
    );
    // Monetary measure name with sum: currency format.
    assert_eq!(result.value_format, ValueFormat::Currency);
}

#[test]
fn cancellation_aborts_between_passes() {
    let dataset = sales_dataset();
    let handle = CancelHandle::new();
    handle.cancel();
    let guard = ExecutionGuard::new(handle);
    assert!(matches!(
        run_pivot(
            &dataset,
            &query(&["region"], &["product"], &["units"], "sum"),
            &guard
        ),
        Err(PivotError::Cancelled)
    ));
}

// ============================================================================
// MULTI-MEASURE AND METADATA
// ============================================================================

#[test]
fn multiple_measures_cross_product_columns() {
    let table = Table::from_columns(vec![
        Column::new(
            ColumnSchema::new("region", "region", ColumnKind::Text),
            vec![text("N"), text("S")],
        ),
        Column::new(
            ColumnSchema::new("units", "units", ColumnKind::Integer),
            vec![CellValue::Integer(1), CellValue::Integer(2)],
        ),
        Column::new(
            ColumnSchema::new("weight", "weight", ColumnKind::Real),
            vec![CellValue::Number(0.5), CellValue::Number(1.5)],
        ),
    ]);
    let dataset = Dataset::new("ds-3-test".into(), "x.csv".into(), table);
    let result = run(
        &dataset,
        &query(&[], &["region"], &["units", "weight"], "sum"),
    )
    .unwrap();

    // Column tuples N,S each crossed with both measures, measure label first.
    assert_eq!(
        result.column_headers,
        vec![
            vec!["units".to_string(), "N".to_string()],
            vec!["weight".to_string(), "N".to_string()],
            vec!["units".to_string(), "S".to_string()],
            vec!["weight".to_string(), "S".to_string()],
        ]
    );
    assert_eq!(result.values[0], vec![Some(1.0), Some(0.5), Some(2.0), Some(1.5)]);
}

#[test]
fn aggregation_options_follow_currency_heuristics() {
    let options = aggregation_options(&["Total estimado Anual".to_string()]);
    let sum = options.iter().find(|o| o.id == "sum").unwrap();
    let count = options.iter().find(|o| o.id == "count").unwrap();
    assert_eq!(sum.format, ValueFormat::Currency);
    assert_eq!(sum.label, "Somar");
    assert_eq!(count.format, ValueFormat::Number);

    let plain = aggregation_options(&["units".to_string()]);
    assert!(plain.iter().all(|o| o.format == ValueFormat::Number));
}

#[test]
fn filter_value_index_is_stable_across_queries() {
    let dataset = sales_dataset();
    let first = dataset.filter_values("region").unwrap();
    let second = dataset.filter_values("region").unwrap();
    assert_eq!(*first, *second);
    assert_eq!(*first, vec!["N".to_string(), "S".to_string()]);
}
