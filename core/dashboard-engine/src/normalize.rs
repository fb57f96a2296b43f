//! FILENAME: core/dashboard-engine/src/normalize.rs
//! PURPOSE: Turns a loaded workbook table into normalized contract rows.
//! CONTEXT: Resolves canonical columns through the alias table, coerces
//! numerics and dates, detects month columns, discards summary ("Total…")
//! rows and derives the executed/committed/balance/rate fields every
//! downstream derivation relies on.

use crate::columns::{parse_month_label, Field, MonthInfo};
use crate::error::DashboardError;
use chrono::{Datelike, NaiveDate};
use model::{collate, parse_flexible_date, parse_flexible_number, CellValue, Table};
use serde::Serialize;
use std::collections::BTreeMap;

/// Rows whose description starts with one of these (or equals the first
/// two) are sheet summary rows, not contracts. The canonical set observed
/// in production workbooks; adjust here if a new variant shows up.
pub const SUMMARY_PREFIXES: [&str; 4] = ["total da ", "total de ", "total das ", "total dos "];

/// One normalized contract.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContractRow {
    pub descricao: String,
    pub ugr: String,
    pub pi: String,
    pub cnpj: String,
    pub processo: String,
    pub contrato: String,
    pub status: String,
    pub prorrogacao: String,
    pub vigencia: Option<NaiveDate>,
    pub valor_mensal: f64,
    pub total_estimado: f64,
    pub saldo_empenhos: f64,
    pub saldo_rap: f64,
    pub total_rap_empenho: f64,
    /// Month values aligned with the dataset's `MonthInfo` list.
    pub months: Vec<f64>,

    // Derived fields.
    pub executado_total: f64,
    pub empenhado_total: f64,
    pub saldo_previsto: f64,
    pub execucao_pct: f64,
    pub media_mensal_exec: f64,
}

impl ContractRow {
    pub fn vigencia_str(&self) -> String {
        self.vigencia
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default()
    }
}

/// The normalizer's output: rows, months, warnings, filter options and the
/// label map used by table views.
#[derive(Debug, Clone)]
pub struct NormalizedContracts {
    pub rows: Vec<ContractRow>,
    pub months: Vec<MonthInfo>,
    pub warnings: Vec<String>,
    pub column_map: BTreeMap<String, String>,
}

/// Fields the dashboard cannot do without; their absence is a warning, not
/// an error, because filters still let users inspect what did load.
const REQUIRED_FIELDS: [Field; 5] = [
    Field::Descricao,
    Field::Ugr,
    Field::Pi,
    Field::Status,
    Field::TotalEstimado,
];

pub fn normalize_table(table: &Table, today: NaiveDate) -> Result<NormalizedContracts, DashboardError> {
    let mut warnings = Vec::new();

    // Canonical column resolution: first alias match wins.
    let mut resolved: BTreeMap<&'static str, String> = BTreeMap::new();
    let mut column_map: BTreeMap<String, String> = BTreeMap::new();
    for column in table.columns() {
        if let Some(field) = Field::match_label(&column.schema.label) {
            resolved
                .entry(field.key())
                .or_insert_with(|| column.schema.key.clone());
        }
    }
    for field in Field::ALL {
        let label = resolved
            .get(field.key())
            .and_then(|key| table.column(key))
            .map(|c| c.schema.label.clone())
            .unwrap_or_else(|| field.label().to_string());
        column_map.insert(field.key().to_string(), label);
    }
    for extra in ["saldo_previsto", "execucao_pct", "media_mensal_exec"] {
        column_map.insert(extra.to_string(), default_extra_label(extra).to_string());
    }

    for field in REQUIRED_FIELDS {
        if !resolved.contains_key(field.key()) {
            warnings.push(format!(
                "Coluna '{}' não foi localizada. Utilize os filtros para conferir os dados.",
                field.key()
            ));
        }
    }

    // Month columns, ordered chronologically, deduplicated by month.
    let mut months: Vec<(MonthInfo, String)> = Vec::new();
    for column in table.columns() {
        if let Some(date) = parse_month_label(&column.schema.label, today.year()) {
            let info = MonthInfo::from_date(date, &column.schema.label);
            if !months.iter().any(|(existing, _)| existing.key == info.key) {
                months.push((info, column.schema.key.clone()));
            }
        }
    }
    months.sort_by_key(|(info, _)| info.first_day);
    if months.is_empty() {
        warnings.push(
            "Colunas mensais não foram encontradas. Série temporal e heatmap ficarão vazios."
                .to_string(),
        );
    }

    let text_of = |row: usize, field: Field| -> String {
        resolved
            .get(field.key())
            .and_then(|key| table.value(row, key))
            .map(cell_text)
            .unwrap_or_default()
    };
    let number_of = |row: usize, field: Field| -> f64 {
        resolved
            .get(field.key())
            .and_then(|key| table.value(row, key))
            .map(cell_number)
            .unwrap_or(0.0)
    };

    let mut rows = Vec::new();
    let mut unparseable_dates = 0usize;
    for index in 0..table.row_count() {
        let mut row = ContractRow {
            descricao: text_of(index, Field::Descricao),
            ugr: text_of(index, Field::Ugr),
            pi: text_of(index, Field::Pi),
            cnpj: text_of(index, Field::Cnpj),
            processo: text_of(index, Field::Processo),
            contrato: text_of(index, Field::Contrato),
            status: text_of(index, Field::Status),
            prorrogacao: text_of(index, Field::Prorrogacao),
            vigencia: None,
            valor_mensal: number_of(index, Field::ValorMensal),
            total_estimado: number_of(index, Field::TotalEstimado),
            saldo_empenhos: number_of(index, Field::SaldoEmpenhos),
            saldo_rap: number_of(index, Field::SaldoRap),
            total_rap_empenho: number_of(index, Field::TotalRapEmpenho),
            months: months
                .iter()
                .map(|(_, key)| table.value(index, key).map(cell_number).unwrap_or(0.0))
                .collect(),
            ..ContractRow::default()
        };

        let raw_vigencia = resolved
            .get(Field::Vigencia.key())
            .and_then(|key| table.value(index, key));
        row.vigencia = match raw_vigencia {
            Some(CellValue::Date(date)) => Some(*date),
            Some(CellValue::Absent) | None => None,
            Some(other) => {
                let text = cell_text(other);
                if text.is_empty() {
                    None
                } else {
                    let parsed = parse_flexible_date(&text);
                    if parsed.is_none() {
                        unparseable_dates += 1;
                    }
                    parsed
                }
            }
        };

        let executed_informed = number_of(index, Field::ExecutadoInformado);
        derive_row(&mut row, executed_informed);

        if is_summary_row(&row) {
            continue;
        }
        rows.push(row);
    }

    if unparseable_dates > 0 {
        warnings.push(format!(
            "{} contratos com data de vigência ilegível; tratados como sem data.",
            unparseable_dates
        ));
    }

    if rows.is_empty() {
        return Err(DashboardError::EmptyInput);
    }

    Ok(NormalizedContracts {
        rows,
        months: months.into_iter().map(|(info, _)| info).collect(),
        warnings,
        column_map,
    })
}

/// Derived fields: executed falls back from the informed value to the month
/// sum to the committed total; committed falls back from the RAP+empenho
/// total to the sum of its parts.
fn derive_row(row: &mut ContractRow, executed_informed: f64) {
    let month_sum: f64 = row.months.iter().sum();
    let committed = if row.total_rap_empenho != 0.0 {
        row.total_rap_empenho
    } else {
        row.saldo_empenhos + row.saldo_rap
    };

    row.empenhado_total = committed;
    row.executado_total = if executed_informed != 0.0 {
        executed_informed
    } else if month_sum != 0.0 {
        month_sum
    } else {
        committed
    };
    row.saldo_previsto = row.total_estimado - row.executado_total;
    row.execucao_pct = if row.total_estimado > 0.0 {
        row.executado_total / row.total_estimado * 100.0
    } else {
        0.0
    };

    let months_with_value = row.months.iter().filter(|v| v.abs() > 0.0).count();
    row.media_mensal_exec = if months_with_value > 0 {
        row.executado_total / months_with_value as f64
    } else {
        0.0
    };
}

/// Summary-row detection: "Total", "Total Geral", "Total da/de/das/dos …",
/// a bare "Total …" without a unit code, or a row with no identifiers.
fn is_summary_row(row: &ContractRow) -> bool {
    let desc = normalized_token(&row.descricao);
    let ugr = normalized_token(&row.ugr);
    let pi = normalized_token(&row.pi);

    if desc.is_empty() && ugr.is_empty() && pi.is_empty() {
        return true;
    }
    if desc.is_empty() {
        return false;
    }
    if desc == "total" || desc == "total geral" {
        return true;
    }
    if SUMMARY_PREFIXES.iter().any(|prefix| desc.starts_with(prefix)) {
        return true;
    }
    if desc.starts_with("total ") && ugr.is_empty() {
        return true;
    }
    false
}

fn normalized_token(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    if lowered == "nan" || lowered == "none" || lowered == "null" {
        String::new()
    } else {
        lowered
    }
}

fn cell_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Absent => String::new(),
        other => other.as_filter_string().unwrap_or_default(),
    }
}

/// Contract sheets mix typed and textual numerics; text goes through the
/// flexible parser (R$, thousands separators) and failures count as zero.
fn cell_number(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Text(text) => parse_flexible_number(text).unwrap_or(0.0),
        other => other.as_number().unwrap_or(0.0),
    }
}

/// Distinct non-empty values of one text extractor, collation-sorted.
pub fn distinct_values<F>(rows: &[ContractRow], extract: F) -> Vec<String>
where
    F: Fn(&ContractRow) -> &str,
{
    let mut seen = std::collections::HashSet::new();
    let mut values = Vec::new();
    for row in rows {
        let text = extract(row).trim();
        if text.is_empty() || text.eq_ignore_ascii_case("nan") {
            continue;
        }
        if seen.insert(text.to_string()) {
            values.push(text.to_string());
        }
    }
    collate::sort_values(&mut values);
    values
}

fn default_extra_label(key: &str) -> &'static str {
    match key {
        "saldo_previsto" => "Saldo Previsto",
        "execucao_pct" => "Execução (%)",
        "media_mensal_exec" => "Média Mensal Executada",
        _ => "",
    }
}
