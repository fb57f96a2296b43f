//! FILENAME: core/dashboard-engine/src/columns.rs
//! PURPOSE: Canonical contract columns and month-column detection.
//! CONTEXT: Contract workbooks arrive with wildly varying headers. Each
//! canonical field owns a list of sanitized aliases; the first table column
//! whose sanitized label matches wins. Month columns are recognized by
//! date-like headers (ISO dates, yyyy-mm patterns, Portuguese month names).

use chrono::{Datelike, NaiveDate};
use model::derive_key;

/// Canonical contract fields, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Descricao,
    Ugr,
    Pi,
    Cnpj,
    Processo,
    Contrato,
    Vigencia,
    Status,
    Prorrogacao,
    ValorMensal,
    TotalEstimado,
    SaldoEmpenhos,
    SaldoRap,
    TotalRapEmpenho,
    ExecutadoInformado,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::Descricao,
        Field::Ugr,
        Field::Pi,
        Field::Cnpj,
        Field::Processo,
        Field::Contrato,
        Field::Vigencia,
        Field::Status,
        Field::Prorrogacao,
        Field::ValorMensal,
        Field::TotalEstimado,
        Field::SaldoEmpenhos,
        Field::SaldoRap,
        Field::TotalRapEmpenho,
        Field::ExecutadoInformado,
    ];

    /// Sanitized header aliases, most specific first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Descricao => &[
                "descricao_das_despesas",
                "descricao_despesa",
                "descricao",
                "despesa",
                "tipo_da_despesa",
                "tipo_objeto_despesa",
                "historico",
            ],
            Field::Ugr => &[
                "ugr",
                "unidade_gestora",
                "unidade_gestora_responsavel",
                "unidade_orcamentaria",
                "uorg",
            ],
            Field::Pi => &["pi_2025", "pi", "plano_interno", "plano_interno_2025", "pi2024", "pi2026"],
            Field::Cnpj => &["cnpj", "cnpj_fornecedor", "cnpj_contratada", "cnpj_cpf"],
            Field::Processo => &[
                "processo",
                "numero_processo",
                "n_processo",
                "processo_sei",
                "processo_administrativo",
            ],
            Field::Contrato => &[
                "n_contrato",
                "no_contrato",
                "numero_contrato",
                "contrato",
                "numero_do_contrato",
            ],
            Field::Vigencia => &[
                "vigencia",
                "vigencia_final",
                "data_vigencia",
                "data_vigencia_fim",
                "vigencia_termino",
                "vigencia_fim",
            ],
            Field::Status => &[
                "status_do_contrato",
                "status_contrato",
                "status",
                "situacao_do_contrato",
            ],
            Field::Prorrogacao => &[
                "situacao_da_prorrogacao",
                "situacao_prorrogacao",
                "prorrogacao",
            ],
            Field::ValorMensal => &[
                "valor_contrato_media_mensal",
                "valor_contrato_mensal",
                "valor_medio_mensal",
                "valor_mensal_medio_contrato",
                "valor_mensal",
            ],
            Field::TotalEstimado => &[
                "total_estimado_anual",
                "estimado_anual",
                "total_estimado",
                "total_previsto_anual",
                "total_anual_estimado",
            ],
            Field::SaldoEmpenhos => &[
                "saldo_empenhos_2025",
                "saldo_empenhos",
                "saldo_de_empenhos_2025",
            ],
            Field::SaldoRap => &["saldo_de_empenhos_rap", "saldo_empenhos_rap", "saldo_rap"],
            Field::TotalRapEmpenho => &[
                "total_rap_empenho",
                "total_rap_e_empenho",
                "total_rap_mais_empenho",
                "total_empenho_rap",
            ],
            Field::ExecutadoInformado => &["executado_total", "valor_executado", "executado"],
        }
    }

    /// Canonical key used in tables and filters.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Descricao => "descricao",
            Field::Ugr => "ugr",
            Field::Pi => "pi",
            Field::Cnpj => "cnpj",
            Field::Processo => "processo",
            Field::Contrato => "contrato",
            Field::Vigencia => "vigencia",
            Field::Status => "status",
            Field::Prorrogacao => "prorrogacao",
            Field::ValorMensal => "valor_mensal",
            Field::TotalEstimado => "total_estimado",
            Field::SaldoEmpenhos => "saldo_empenhos",
            Field::SaldoRap => "saldo_rap",
            Field::TotalRapEmpenho => "total_rap_empenho",
            Field::ExecutadoInformado => "executado_total",
        }
    }

    /// Default display label.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Descricao => "Descrição das despesas",
            Field::Ugr => "UGR",
            Field::Pi => "PI 2025",
            Field::Cnpj => "CNPJ",
            Field::Processo => "Processo",
            Field::Contrato => "nº Contrato",
            Field::Vigencia => "Vigência",
            Field::Status => "Status do Contrato",
            Field::Prorrogacao => "Situação da prorrogação",
            Field::ValorMensal => "Valor Contrato Média mensal",
            Field::TotalEstimado => "Total estimado Anual",
            Field::SaldoEmpenhos => "Saldo Empenhos 2025",
            Field::SaldoRap => "Saldo de Empenhos RAP",
            Field::TotalRapEmpenho => "Total RAP + Empenho",
            Field::ExecutadoInformado => "Executado Total",
        }
    }

    /// Resolves which canonical field (if any) a header label feeds.
    pub fn match_label(label: &str) -> Option<Field> {
        let sanitized = derive_key(label);
        Field::ALL
            .into_iter()
            .find(|field| field.aliases().contains(&sanitized.as_str()))
    }
}

/// A detected month column.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthInfo {
    /// Stable key: `month_2025_03`.
    pub key: String,
    /// Display label: `Mar/2025`.
    pub label: String,
    /// First day of the month, for ordering and snapshot keys.
    pub first_day: NaiveDate,
    /// The header it came from.
    pub source_label: String,
}

impl MonthInfo {
    pub fn from_date(date: NaiveDate, source_label: &str) -> MonthInfo {
        let first_day = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap();
        MonthInfo {
            key: format!("month_{}_{:02}", first_day.year(), first_day.month()),
            label: format!("{}/{}", MONTH_SHORT[first_day.month() as usize - 1], first_day.year()),
            first_day,
            source_label: source_label.to_string(),
        }
    }
}

const MONTH_SHORT: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

const MONTH_NAMES: [(&str, u32); 14] = [
    ("janeiro", 1),
    ("fevereiro", 2),
    ("marco", 3),
    ("abril", 4),
    ("maio", 5),
    ("junho", 6),
    ("julho", 7),
    ("agosto", 8),
    ("setembro", 9),
    ("outubro", 10),
    ("novembro", 11),
    ("dezembro", 12),
    ("sep", 9),
    ("dez", 12),
];

const MONTH_ABBREVIATIONS: [(&str, u32); 12] = [
    ("jan", 1),
    ("fev", 2),
    ("mar", 3),
    ("abr", 4),
    ("mai", 5),
    ("jun", 6),
    ("jul", 7),
    ("ago", 8),
    ("set", 9),
    ("out", 10),
    ("nov", 11),
    ("dez", 12),
];

/// Recognizes a month column from its header label.
pub fn parse_month_label(label: &str, fallback_year: i32) -> Option<NaiveDate> {
    // Reserved canonical headers are never months.
    if Field::match_label(label).is_some() {
        return None;
    }

    // Full or prefixed ISO date ("2025-03-01", "2025-03-01 00:00:00").
    if let Some(date) = model::parse_flexible_date(label) {
        return NaiveDate::from_ymd_opt(date.year(), date.month(), 1);
    }

    let sanitized = derive_key(label);

    // "2025_03" / "2025-03" patterns survive sanitization as "2025_03".
    if let Some((year, month)) = split_year_month(&sanitized) {
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    // Portuguese month names, with an optional 4-digit year anywhere.
    let year = find_year(&sanitized).unwrap_or(fallback_year);
    for (name, month) in MONTH_NAMES {
        if sanitized.contains(name) {
            return NaiveDate::from_ymd_opt(year, month, 1);
        }
    }
    for (abbr, month) in MONTH_ABBREVIATIONS {
        if sanitized == abbr
            || sanitized.starts_with(&format!("{}_", abbr))
            || sanitized.ends_with(&format!("_{}", abbr))
        {
            return NaiveDate::from_ymd_opt(year, month, 1);
        }
    }
    None
}

/// Matches a leading `yyyy_mm` in a sanitized label.
fn split_year_month(sanitized: &str) -> Option<(i32, u32)> {
    let mut parts = sanitized.split('_');
    let year: i32 = parts.next()?.parse().ok()?;
    if !(2000..=2100).contains(&year) {
        return None;
    }
    let month: u32 = parts.next()?.parse().ok()?;
    if (1..=12).contains(&month) {
        Some((year, month))
    } else {
        None
    }
}

/// First plausible 4-digit year inside a sanitized label.
fn find_year(sanitized: &str) -> Option<i32> {
    for token in sanitized.split('_') {
        if token.len() == 4 {
            if let Ok(year) = token.parse::<i32>() {
                if (2000..=2100).contains(&year) {
                    return Some(year);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_varied_headers() {
        assert_eq!(Field::match_label("Descrição das despesas"), Some(Field::Descricao));
        assert_eq!(Field::match_label("UGR"), Some(Field::Ugr));
        assert_eq!(Field::match_label("Total estimado Anual"), Some(Field::TotalEstimado));
        assert_eq!(Field::match_label("Saldo\nde Empenhos RAP"), Some(Field::SaldoRap));
        assert_eq!(Field::match_label("nº Contrato"), Some(Field::Contrato));
        assert_eq!(Field::match_label("coluna qualquer"), None);
    }

    #[test]
    fn month_headers_parse_in_all_shapes() {
        let date = |y, m| NaiveDate::from_ymd_opt(y, m, 1);
        assert_eq!(parse_month_label("2025-03-01", 2025), date(2025, 3));
        assert_eq!(parse_month_label("2025-03-01 00:00:00", 2025), date(2025, 3));
        assert_eq!(parse_month_label("2025/04", 2025), date(2025, 4));
        assert_eq!(parse_month_label("Janeiro 2025", 2024), date(2025, 1));
        assert_eq!(parse_month_label("fev", 2025), date(2025, 2));
        assert_eq!(parse_month_label("Total estimado Anual", 2025), None);
        assert_eq!(parse_month_label("observações", 2025), None);
    }

    #[test]
    fn month_info_builds_key_and_label() {
        let info = MonthInfo::from_date(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(), "mar/2025");
        assert_eq!(info.key, "month_2025_03");
        assert_eq!(info.label, "Mar/2025");
        assert_eq!(info.first_day, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }
}
