//! FILENAME: core/model/src/value.rs
//! PURPOSE: The cell value enum shared by every table in the engine.
//! CONTEXT: Uploaded spreadsheets are heterogeneous; after loading, every
//! cell is one of these variants and missing cells are uniformly `Absent`.

use chrono::NaiveDate;

/// A single cell of an in-memory table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Absent,
    Integer(i64),
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    /// Numeric coercion used by aggregation and calculated columns.
    /// Text parses only when it is a plain number; booleans count as 0/1;
    /// dates and absent cells do not coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Absent => None,
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Number(v) => Some(*v),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Date(_) => None,
        }
    }

    /// The stringified form used for filters, grouping keys and the
    /// filter-value index. Absent cells have no stringified form.
    pub fn as_filter_string(&self) -> Option<String> {
        match self {
            CellValue::Absent => None,
            CellValue::Integer(v) => Some(v.to_string()),
            CellValue::Number(v) => Some(format_number(*v)),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }

    /// JSON projection for raw-row envelopes. Absent becomes `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Absent => serde_json::Value::Null,
            CellValue::Integer(v) => serde_json::json!(v),
            CellValue::Number(v) => serde_json::json!(v),
            CellValue::Text(s) => serde_json::json!(s),
            CellValue::Bool(b) => serde_json::json!(b),
            CellValue::Date(d) => serde_json::json!(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Integers render without a trailing `.0` so filter values for a numeric
/// column read naturally.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Parses spreadsheet-style numbers: optional `R$` prefix, spaces and
/// non-breaking spaces stripped, both `,` and `.` accepted with the
/// right-most separator taken as the decimal point.
pub fn parse_flexible_number(raw: &str) -> Option<f64> {
    let mut text = raw.trim().to_string();
    if text.is_empty() {
        return None;
    }
    text = text
        .replace("R$", "")
        .replace('\u{a0}', "")
        .replace(' ', "");
    if text.is_empty() || text == "-" || text == "--" {
        return None;
    }
    let has_comma = text.contains(',');
    let has_dot = text.contains('.');
    let normalized = if has_comma && has_dot {
        if text.rfind(',') > text.rfind('.') {
            text.replace('.', "").replace(',', ".")
        } else {
            text.replace(',', "")
        }
    } else if has_comma {
        text.replace('.', "").replace(',', ".")
    } else {
        text
    };
    normalized.parse::<f64>().ok()
}

/// Parses dates in the two accepted shapes: ISO-8601 (`2025-03-15`, with an
/// optional time suffix ignored) and Brazilian `dd/mm/yyyy`.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let head = text.split(&[' ', 'T'][..]).next().unwrap_or(text);
    if let Ok(date) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(head, "%d/%m/%Y") {
        return Some(date);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_numbers_accept_currency_and_separators() {
        assert_eq!(parse_flexible_number("R$ 1.234,56"), Some(1234.56));
        assert_eq!(parse_flexible_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_flexible_number("10"), Some(10.0));
        assert_eq!(parse_flexible_number("3,5"), Some(3.5));
        assert_eq!(parse_flexible_number("-"), None);
        assert_eq!(parse_flexible_number("abc"), None);
    }

    #[test]
    fn flexible_dates_accept_iso_and_brazilian() {
        assert_eq!(
            parse_flexible_date("2025-03-15"),
            NaiveDate::from_ymd_opt(2025, 3, 15)
        );
        assert_eq!(
            parse_flexible_date("15/03/2025"),
            NaiveDate::from_ymd_opt(2025, 3, 15)
        );
        assert_eq!(
            parse_flexible_date("2025-03-15 00:00:00"),
            NaiveDate::from_ymd_opt(2025, 3, 15)
        );
        assert_eq!(parse_flexible_date("35/99/2025"), None);
    }

    #[test]
    fn filter_strings_render_integers_without_fraction() {
        assert_eq!(
            CellValue::Number(10.0).as_filter_string(),
            Some("10".to_string())
        );
        assert_eq!(
            CellValue::Number(10.5).as_filter_string(),
            Some("10.5".to_string())
        );
        assert_eq!(CellValue::Absent.as_filter_string(), None);
    }

    #[test]
    fn numeric_coercion_covers_text_and_bool() {
        assert_eq!(CellValue::Text("42".into()).as_number(), Some(42.0));
        assert_eq!(CellValue::Text("n/a".into()).as_number(), None);
        assert_eq!(CellValue::Bool(true).as_number(), Some(1.0));
        assert_eq!(CellValue::Absent.as_number(), None);
    }
}
