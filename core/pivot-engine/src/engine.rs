//! FILENAME: core/pivot-engine/src/engine.rs
//! Pivot planner - evaluates a PivotQuery against a dataset snapshot.
//!
//! Algorithm:
//! 1. Validate aggregator, measures and referenced columns
//! 2. Filter pass: keep rows whose stringified values sit in the allow-sets
//! 3. Ephemeral pre-calculations (skipping columns already materialized)
//! 4. Group by row-tuple x column-tuple
//! 5. Materialize sorted headers (absent sorts last as "Células Vazias"),
//!    cross-producting column tuples with measures when several are selected
//! 6. Post-calculations appended after the aggregated measure columns
//! 7. Totals recomputed from the underlying filtered rows, never from the
//!    visible cells, so non-additive aggregators stay correct
//!
//! The planner is pure with respect to the snapshot it receives; the only
//! side channel is the ExecutionGuard observed between passes.

use crate::definition::{
    name_is_currency, Aggregator, PivotError, PivotQuery, ValueFormat, MAX_MEASURES,
};
use crate::guard::ExecutionGuard;
use crate::view::PivotResult;
use model::{evaluate_pre_calc, CalcStage, Calculations, Column, Dataset, Table};
use parser::{eval, parse, MapScope};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A grouping key: one stringified value (or absent) per dimension.
type GroupTuple = Vec<Option<String>>;

/// One visible result column before post-calculations.
struct VisibleColumn {
    tuple: GroupTuple,
    measure_index: usize,
}

/// Executes the query against the dataset snapshot.
pub fn run_pivot(
    dataset: &Dataset,
    query: &PivotQuery,
    guard: &ExecutionGuard,
) -> Result<PivotResult, PivotError> {
    let aggregator = Aggregator::from_id(&query.aggregator)
        .ok_or_else(|| PivotError::UnknownAggregator(query.aggregator.clone()))?;

    let measures = query.effective_measures();
    if measures.is_empty() {
        return Err(PivotError::NoMeasure);
    }
    if measures.len() > MAX_MEASURES {
        return Err(PivotError::TooManyMeasures(measures.len()));
    }

    for key in query
        .rows
        .iter()
        .chain(query.columns.iter())
        .chain(query.filters.keys())
    {
        if !dataset.table.contains_column(key) {
            return Err(PivotError::UnknownColumn(key.clone()));
        }
    }

    // 1. Filter pass.
    let kept = filter_rows(&dataset.table, &query.filters);
    guard.checkpoint()?;

    let mut working = dataset.table.take_rows(&kept);
    let mut warnings = Vec::new();

    // 2. Ephemeral pre-calculations. Columns the store already materialized
    // ride along in the snapshot and are not evaluated twice.
    let pre_specs: Vec<_> = query
        .pre_calculations
        .iter()
        .filter(|spec| spec.stage == CalcStage::Pre)
        .cloned()
        .collect();
    for spec in &pre_specs {
        let key = spec.output_key();
        let already = working
            .column(&key)
            .map_or(false, |column| column.schema.calculated);
        if already {
            continue;
        }
        let column = evaluate_pre_calc(&working, spec)?;
        for name in &column.missing {
            warnings.push(unknown_placeholder_warning(&spec.name, name));
        }
        working.push_column(column.schema, column.values);
    }
    guard.checkpoint()?;

    for measure in &measures {
        if !working.contains_column(measure) {
            return Err(PivotError::UnknownColumn(measure.clone()));
        }
    }

    let measure_labels: Vec<String> = measures
        .iter()
        .map(|m| working.column(m).unwrap().schema.label.clone())
        .collect();
    let value_format = if aggregator.supports_currency()
        && (name_is_currency(&measure_labels[0]) || name_is_currency(&measures[0]))
    {
        ValueFormat::Currency
    } else {
        ValueFormat::Number
    };

    let post_specs: Vec<_> = query
        .post_calculations
        .iter()
        .filter(|spec| spec.stage == CalcStage::Post)
        .cloned()
        .collect();

    // 3a. Dimensionless query: a single summary aggregation per measure.
    if query.rows.is_empty() && query.columns.is_empty() {
        if !post_specs.is_empty() {
            return Err(PivotError::InvalidExpression(
                "Não é possível adicionar colunas calculadas sem dimensões na tabela dinâmica."
                    .to_string(),
            ));
        }
        let mut summary_values = BTreeMap::new();
        for measure in &measures {
            let column = working.column(measure).unwrap();
            summary_values.insert(measure.clone(), aggregate_all(column, aggregator));
        }
        let first = summary_values.get(&measures[0]).copied().flatten();
        if guard.soft_exceeded() {
            warnings.push(soft_deadline_warning());
        }
        return Ok(PivotResult {
            dataset_id: dataset.id.clone(),
            rows: Vec::new(),
            columns: Vec::new(),
            measure: measures.first().cloned(),
            measures,
            aggregator: aggregator.id().to_string(),
            row_headers: Vec::new(),
            column_headers: Vec::new(),
            column_keys: Vec::new(),
            values: Vec::new(),
            row_totals: Vec::new(),
            column_totals: Vec::new(),
            grand_total: first,
            summary_value: first,
            summary_values,
            calculations: Calculations {
                pre: pre_specs,
                post: Vec::new(),
            },
            value_format,
            warnings,
        });
    }

    // 3b. Grouping pass.
    let mut row_groups: HashMap<GroupTuple, Vec<usize>> = HashMap::new();
    let mut col_groups: HashMap<GroupTuple, Vec<usize>> = HashMap::new();
    let mut cells: HashMap<(GroupTuple, GroupTuple), Vec<usize>> = HashMap::new();

    for row in 0..working.row_count() {
        let row_tuple = tuple_for(&working, row, &query.rows);
        let col_tuple = tuple_for(&working, row, &query.columns);
        row_groups.entry(row_tuple.clone()).or_default().push(row);
        col_groups.entry(col_tuple.clone()).or_default().push(row);
        cells
            .entry((row_tuple, col_tuple))
            .or_default()
            .push(row);
    }
    guard.checkpoint()?;

    let mut row_tuples: Vec<GroupTuple> = row_groups.keys().cloned().collect();
    row_tuples.sort_by(compare_tuples);
    let mut col_tuples: Vec<GroupTuple> = col_groups.keys().cloned().collect();
    col_tuples.sort_by(compare_tuples);

    // Empty input keeps the axes empty instead of emitting a ghost group.
    if working.row_count() == 0 {
        row_tuples.clear();
        col_tuples.clear();
    }

    // 4. Materialization: visible columns are column tuples crossed with
    // measures; without column dimensions each measure is one column.
    let multi_measure = measures.len() > 1;
    let mut visible: Vec<VisibleColumn> = Vec::new();
    if query.columns.is_empty() {
        for measure_index in 0..measures.len() {
            visible.push(VisibleColumn {
                tuple: Vec::new(),
                measure_index,
            });
        }
    } else {
        for tuple in &col_tuples {
            for measure_index in 0..measures.len() {
                visible.push(VisibleColumn {
                    tuple: tuple.clone(),
                    measure_index,
                });
            }
        }
    }

    let mut column_headers: Vec<Vec<String>> = Vec::new();
    let mut column_keys: Vec<String> = Vec::new();
    for column in &visible {
        let mut parts: Vec<Option<String>> = Vec::new();
        if query.columns.is_empty() || multi_measure {
            parts.push(Some(measure_labels[column.measure_index].clone()));
        }
        parts.extend(column.tuple.iter().cloned());
        column_headers.push(parts.iter().map(PivotResult::display_part).collect());
        column_keys.push(column_key(&parts));
    }

    let mut values: Vec<Vec<Option<f64>>> = Vec::with_capacity(row_tuples.len());
    for row_tuple in &row_tuples {
        let mut row_cells = Vec::with_capacity(visible.len());
        for column in &visible {
            let group = cells.get(&(row_tuple.clone(), column.tuple.clone()));
            let measure_column = working.column(&measures[column.measure_index]).unwrap();
            let value = match group {
                Some(indices) => aggregate_values(measure_column, indices, aggregator),
                None => empty_group_value(aggregator),
            };
            row_cells.push(value);
        }
        values.push(row_cells);
    }

    // 5. Totals from the underlying filtered rows (invariants (ii)/(iii)).
    let primary_column = working.column(&measures[0]).unwrap();
    let row_totals: Vec<Option<f64>> = row_tuples
        .iter()
        .map(|tuple| aggregate_values(primary_column, &row_groups[tuple], aggregator))
        .collect();
    let mut column_totals: Vec<Option<f64>> = visible
        .iter()
        .map(|column| {
            let measure_column = working.column(&measures[column.measure_index]).unwrap();
            match col_groups.get(&column.tuple) {
                Some(indices) => aggregate_values(measure_column, indices, aggregator),
                None => empty_group_value(aggregator),
            }
        })
        .collect();
    let grand_total = aggregate_all(primary_column, aggregator);

    // 6. Post-calculations.
    guard.checkpoint()?;
    for spec in &post_specs {
        let expr = parse(&spec.expression)?;
        let mut missing = Vec::new();

        // Placeholders normally resolve against result columns. A
        // placeholder naming a measure instead switches the calculation to
        // cell-wise mode: the expression runs once per existing column with
        // the measure bound to that column's cell.
        let placeholder_names = expr.placeholders();
        let references_measure = placeholder_names.iter().any(|name| {
            let is_column = column_keys.iter().any(|k| k == name)
                || column_headers
                    .iter()
                    .any(|parts| PivotResult::flatten_header(parts) == *name);
            !is_column
                && (measures.iter().any(|m| m == name)
                    || measure_labels.iter().any(|l| l == name))
        });

        if references_measure {
            let base_count = column_headers.len();
            let mut appended: Vec<Vec<Option<f64>>> = vec![Vec::new(); base_count];
            for row_cells in values.iter() {
                guard.checkpoint()?;
                for cell_index in 0..base_count {
                    let mut scope = MapScope::new();
                    bind_result_columns(&mut scope, &column_keys, &column_headers, row_cells);
                    for measure in &measures {
                        scope.bind(measure.clone(), row_cells[cell_index]);
                    }
                    for label in &measure_labels {
                        scope.bind(label.clone(), row_cells[cell_index]);
                    }
                    let out = finish_cell(eval(&expr, &scope, &mut missing), spec.decimals);
                    appended[cell_index].push(out);
                }
            }
            for cell_index in 0..base_count {
                let source_label = PivotResult::flatten_header(&column_headers[cell_index]);
                column_headers.push(vec![format!("{} ({})", spec.name, source_label)]);
                column_keys.push(format!("{}::{}", spec.output_key(), cell_index));
                let column_cells = &appended[cell_index];
                for (row, value) in column_cells.iter().enumerate() {
                    values[row].push(*value);
                }
                column_totals.push(Some(
                    column_cells.iter().filter_map(|v| *v).sum::<f64>(),
                ));
            }
        } else {
            let mut column_cells: Vec<Option<f64>> = Vec::with_capacity(values.len());
            for row_cells in values.iter() {
                guard.checkpoint()?;
                let mut scope = MapScope::new();
                bind_result_columns(&mut scope, &column_keys, &column_headers, row_cells);
                let out = finish_cell(eval(&expr, &scope, &mut missing), spec.decimals);
                column_cells.push(out);
            }
            let depth = column_headers.iter().map(|p| p.len()).max().unwrap_or(1);
            let mut parts = vec!["Calculado".to_string(); depth.saturating_sub(1)];
            parts.push(spec.name.clone());
            column_headers.push(parts);
            column_keys.push(spec.output_key());
            column_totals.push(Some(column_cells.iter().filter_map(|v| *v).sum::<f64>()));
            for (row, value) in column_cells.iter().enumerate() {
                values[row].push(*value);
            }
        }

        for name in &missing {
            warnings.push(unknown_placeholder_warning(&spec.name, name));
        }
    }

    if guard.soft_exceeded() {
        warnings.push(soft_deadline_warning());
    }

    Ok(PivotResult {
        dataset_id: dataset.id.clone(),
        rows: query.rows.clone(),
        columns: query.columns.clone(),
        measure: measures.first().cloned(),
        measures,
        aggregator: aggregator.id().to_string(),
        row_headers: row_tuples,
        column_headers,
        column_keys,
        values,
        row_totals,
        column_totals,
        grand_total,
        summary_value: None,
        summary_values: BTreeMap::new(),
        calculations: Calculations {
            pre: pre_specs,
            post: post_specs,
        },
        value_format,
        warnings,
    })
}

// ============================================================================
// FILTERING AND GROUPING
// ============================================================================

/// Row indexes surviving every allow-set. An empty allow-set matches
/// nothing; absent values never match.
fn filter_rows(table: &Table, filters: &HashMap<String, Vec<String>>) -> Vec<usize> {
    if filters.is_empty() {
        return (0..table.row_count()).collect();
    }
    let compiled: Vec<(&Column, HashSet<&str>)> = filters
        .iter()
        .filter_map(|(key, allowed)| {
            table
                .column(key)
                .map(|column| (column, allowed.iter().map(|s| s.as_str()).collect()))
        })
        .collect();

    (0..table.row_count())
        .filter(|&row| {
            compiled.iter().all(|(column, allowed)| {
                column.values[row]
                    .as_filter_string()
                    .map_or(false, |text| allowed.contains(text.as_str()))
            })
        })
        .collect()
}

fn tuple_for(table: &Table, row: usize, keys: &[String]) -> GroupTuple {
    keys.iter()
        .map(|key| {
            table
                .value(row, key)
                .and_then(|cell| cell.as_filter_string())
        })
        .collect()
}

/// Lexicographic tuple ordering with absent values last.
fn compare_tuples(a: &GroupTuple, b: &GroupTuple) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    for (left, right) in a.iter().zip(b.iter()) {
        let step = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => l.cmp(r),
        };
        if step != Ordering::Equal {
            return step;
        }
    }
    a.len().cmp(&b.len())
}

/// Stable key for one visible column: the JSON form of its raw parts.
fn column_key(parts: &[Option<String>]) -> String {
    serde_json::to_string(parts).unwrap_or_default()
}

// ============================================================================
// AGGREGATION
// ============================================================================

fn aggregate_values(column: &Column, indices: &[usize], aggregator: Aggregator) -> Option<f64> {
    match aggregator {
        Aggregator::Sum => Some(
            indices
                .iter()
                .filter_map(|&row| column.values[row].as_number())
                .sum(),
        ),
        Aggregator::Count => Some(
            indices
                .iter()
                .filter(|&&row| !column.values[row].is_absent())
                .count() as f64,
        ),
        Aggregator::DistinctCount => {
            let distinct: HashSet<String> = indices
                .iter()
                .filter_map(|&row| column.values[row].as_filter_string())
                .collect();
            Some(distinct.len() as f64)
        }
        Aggregator::Avg => {
            let numbers: Vec<f64> = indices
                .iter()
                .filter_map(|&row| column.values[row].as_number())
                .collect();
            if numbers.is_empty() {
                None
            } else {
                Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
        }
        Aggregator::Min => indices
            .iter()
            .filter_map(|&row| column.values[row].as_number())
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.min(v)))
            }),
        Aggregator::Max => indices
            .iter()
            .filter_map(|&row| column.values[row].as_number())
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.max(v)))
            }),
    }
}

fn aggregate_all(column: &Column, aggregator: Aggregator) -> Option<f64> {
    let indices: Vec<usize> = (0..column.values.len()).collect();
    aggregate_values(column, &indices, aggregator)
}

/// Value for a (row, column) intersection with no underlying rows.
fn empty_group_value(aggregator: Aggregator) -> Option<f64> {
    match aggregator {
        Aggregator::Sum | Aggregator::Count | Aggregator::DistinctCount => Some(0.0),
        Aggregator::Avg | Aggregator::Min | Aggregator::Max => None,
    }
}

// ============================================================================
// POST-CALCULATION HELPERS
// ============================================================================

fn bind_result_columns(
    scope: &mut MapScope,
    column_keys: &[String],
    column_headers: &[Vec<String>],
    row_cells: &[Option<f64>],
) {
    for (index, key) in column_keys.iter().enumerate() {
        let value = row_cells.get(index).copied().flatten();
        scope.bind(key.clone(), value);
        scope.bind(PivotResult::flatten_header(&column_headers[index]), value);
    }
}

/// Division-by-zero (and any other absent outcome) lands as 0 in the cell.
fn finish_cell(value: Option<f64>, decimals: Option<u32>) -> Option<f64> {
    let mut out = value.unwrap_or(0.0);
    if let Some(decimals) = decimals {
        out = parser::apply_decimals(out, decimals);
    }
    Some(out)
}

fn unknown_placeholder_warning(calc_name: &str, placeholder: &str) -> String {
    format!(
        "Cálculo '{}': campo '{}' não encontrado; valor 0 aplicado.",
        calc_name, placeholder
    )
}

fn soft_deadline_warning() -> String {
    "Consulta excedeu o tempo alvo de 30s; o resultado pode demorar.".to_string()
}
