//! FILENAME: core/persistence/src/infer.rs
//! PURPOSE: Column type inference over raw string grids.
//! CONTEXT: Every decoder produces strings; this pass samples up to the
//! first 500 non-empty values per column and assigns a kind:
//! integer when >=90% parse as integers, real when >=90% parse as reals
//! (accepting `,`/`.` decimals and an `R$` prefix), date when >=80% parse
//! as ISO-8601 or dd/mm/yyyy, text otherwise. Numeric columns whose values
//! are strictly 0/1 with at least four samples demote to boolean text.

use model::{parse_flexible_date, parse_flexible_number, CellValue, ColumnKind};

const SAMPLE_LIMIT: usize = 500;
const NUMERIC_THRESHOLD: f64 = 0.90;
const DATE_THRESHOLD: f64 = 0.80;
const BOOLEAN_MIN_SAMPLES: usize = 4;

/// Infers the kind of one column from its raw cells.
pub fn infer_kind(cells: &[String]) -> ColumnKind {
    let samples: Vec<&String> = cells
        .iter()
        .filter(|c| !c.trim().is_empty())
        .take(SAMPLE_LIMIT)
        .collect();
    if samples.is_empty() {
        return ColumnKind::Text;
    }
    let total = samples.len() as f64;

    let integers = samples.iter().filter(|c| parse_integer(c).is_some()).count();
    if integers as f64 / total >= NUMERIC_THRESHOLD {
        return boolean_or(ColumnKind::Integer, &samples);
    }

    let reals = samples
        .iter()
        .filter(|c| parse_flexible_number(c).is_some())
        .count();
    if reals as f64 / total >= NUMERIC_THRESHOLD {
        return boolean_or(ColumnKind::Real, &samples);
    }

    let dates = samples
        .iter()
        .filter(|c| parse_flexible_date(c).is_some())
        .count();
    if dates as f64 / total >= DATE_THRESHOLD {
        return ColumnKind::Date;
    }

    ColumnKind::Text
}

/// A numeric column whose values never leave {0, 1} is a flag, not a
/// measure, once there are enough samples to trust the pattern.
fn boolean_or(kind: ColumnKind, samples: &[&String]) -> ColumnKind {
    if samples.len() >= BOOLEAN_MIN_SAMPLES
        && samples
            .iter()
            .all(|c| matches!(parse_flexible_number(c), Some(v) if v == 0.0 || v == 1.0))
    {
        ColumnKind::Boolean
    } else {
        kind
    }
}

/// Converts one raw cell under the inferred kind. Cells that fail the
/// column's parse become absent rather than poisoning aggregation.
pub fn typed_cell(raw: &str, kind: ColumnKind) -> CellValue {
    let text = raw.trim();
    if text.is_empty() {
        return CellValue::Absent;
    }
    match kind {
        ColumnKind::Integer => match parse_integer(text) {
            Some(v) => CellValue::Integer(v),
            None => parse_flexible_number(text)
                .map(CellValue::Number)
                .unwrap_or(CellValue::Absent),
        },
        ColumnKind::Real => parse_flexible_number(text)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Absent),
        ColumnKind::Date => parse_flexible_date(text)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Absent),
        ColumnKind::Boolean => match parse_flexible_number(text) {
            Some(v) if v == 1.0 => CellValue::Bool(true),
            Some(v) if v == 0.0 => CellValue::Bool(false),
            _ => CellValue::Absent,
        },
        ColumnKind::Text => CellValue::Text(text.to_string()),
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}
