//! FILENAME: core/dashboard-engine/src/derive.rs
//! PURPOSE: Derivations over normalized contract rows.
//! CONTEXT: Everything here is a pure function of (rows, months, today,
//! thresholds): KPIs, per-UGR analysis, monthly series, expiring/expired
//! classification, alerts and the heatmap. "Today" is always a parameter;
//! the engine never reads the clock.

use crate::columns::MonthInfo;
use crate::normalize::ContractRow;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Upper bound for the expiring/expired lists.
pub const CONTRACT_LIST_LIMIT: usize = 50;
/// Heatmap keeps the top descriptions by executed value.
pub const HEATMAP_LIMIT: usize = 10;

/// Alert and classification thresholds, overridable via environment.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Window (days, inclusive) for "expiring soon".
    pub expiring_window_days: i64,
    /// Balance below this share of the estimate raises attention.
    pub low_balance_pct: f64,
    /// Execution above this multiple of the expected pace raises attention.
    pub high_execution_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            expiring_window_days: 60,
            low_balance_pct: 0.20,
            high_execution_pct: 1.20,
        }
    }
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// A contract's lifecycle relative to "today", driven purely by the
/// vigency-end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleStatus {
    NoDate,
    Future,
    OnTrack,
    ExpiredCurrent,
    ExpiredPrevious,
}

pub fn lifecycle_status(vigencia: Option<NaiveDate>, today: NaiveDate) -> LifecycleStatus {
    match vigencia {
        None => LifecycleStatus::NoDate,
        Some(end) => {
            if end.year() > today.year() {
                LifecycleStatus::Future
            } else if end.year() < today.year() {
                LifecycleStatus::ExpiredPrevious
            } else if end >= today {
                LifecycleStatus::OnTrack
            } else {
                LifecycleStatus::ExpiredCurrent
            }
        }
    }
}

/// Days from today to the vigency end (negative when past).
pub fn days_until_end(row: &ContractRow, today: NaiveDate) -> Option<i64> {
    row.vigencia.map(|end| (end - today).num_days())
}

/// Expired: vigency strictly before today, or, when no date exists, a
/// status containing "VENC" but not "VENCENDO".
pub fn is_expired(row: &ContractRow, today: NaiveDate) -> bool {
    match days_until_end(row, today) {
        Some(delta) => delta < 0,
        None => status_says_expired(&row.status),
    }
}

fn status_says_expired(status: &str) -> bool {
    let upper = status.trim().to_uppercase();
    upper.contains("VENC") && !upper.contains("VENCENDO")
}

// ============================================================================
// KPIS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_estimado: f64,
    pub executado: f64,
    pub empenhado: f64,
    pub saldo: f64,
    pub execucao_percentual: f64,
    pub contratos_vencendo: usize,
    pub contratos_vencidos: usize,
}

pub fn compute_kpis(rows: &[ContractRow], today: NaiveDate, thresholds: &Thresholds) -> Kpis {
    let total_estimado: f64 = rows.iter().map(|r| r.total_estimado).sum();
    let executado: f64 = rows.iter().map(|r| r.executado_total).sum();
    let empenhado: f64 = rows.iter().map(|r| r.empenhado_total).sum();

    let mut vencendo = 0usize;
    let mut vencidos = 0usize;
    for row in rows {
        match days_until_end(row, today) {
            Some(delta) if delta < 0 => vencidos += 1,
            Some(delta) if delta <= thresholds.expiring_window_days => vencendo += 1,
            Some(_) => {}
            None => {
                if status_says_expired(&row.status) {
                    vencidos += 1;
                }
            }
        }
    }

    Kpis {
        total_estimado,
        executado,
        empenhado,
        saldo: (total_estimado - executado).max(0.0),
        execucao_percentual: safe_percent(executado, total_estimado),
        contratos_vencendo: vencendo,
        contratos_vencidos: vencidos,
    }
}

pub fn safe_percent(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

// ============================================================================
// UGR ANALYSIS
// ============================================================================

/// Per-UGR aggregate in the projection shape consumed by the auxiliary
/// dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct UgrAnalysis {
    #[serde(rename = "UGR")]
    pub ugr: String,
    #[serde(rename = "Total_Anual_Estimado")]
    pub total_estimado: f64,
    #[serde(rename = "Executado_Total")]
    pub executado_total: f64,
    #[serde(rename = "Comprometido_Total")]
    pub comprometido_total: f64,
    #[serde(rename = "Contratos_Ativos")]
    pub contratos_ativos: usize,
    #[serde(rename = "Contratos_Expirados")]
    pub contratos_expirados: usize,
    #[serde(rename = "Percentual_Execucao")]
    pub percentual_execucao: f64,
}

pub fn ugr_analysis(rows: &[ContractRow], today: NaiveDate) -> Vec<UgrAnalysis> {
    let mut buckets: BTreeMap<String, UgrAnalysis> = BTreeMap::new();
    for row in rows {
        let key = if row.ugr.trim().is_empty() {
            "Não informado".to_string()
        } else {
            row.ugr.trim().to_string()
        };
        let entry = buckets.entry(key.clone()).or_insert_with(|| UgrAnalysis {
            ugr: key,
            total_estimado: 0.0,
            executado_total: 0.0,
            comprometido_total: 0.0,
            contratos_ativos: 0,
            contratos_expirados: 0,
            percentual_execucao: 0.0,
        });
        entry.total_estimado += row.total_estimado;
        entry.executado_total += row.executado_total;
        entry.comprometido_total += row.empenhado_total;
        if is_expired(row, today) {
            entry.contratos_expirados += 1;
        } else {
            entry.contratos_ativos += 1;
        }
    }
    let mut out: Vec<UgrAnalysis> = buckets.into_values().collect();
    for entry in &mut out {
        entry.percentual_execucao = safe_percent(entry.executado_total, entry.total_estimado);
    }
    out
}

/// Per-UGR aggregate in the interactive dashboard shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBreakdown {
    pub ugr: String,
    pub total_estimado: f64,
    pub executado_total: f64,
    pub empenhado_total: f64,
    pub saldo_previsto: f64,
    pub quantidade_contratos: usize,
}

pub fn unit_breakdown(rows: &[ContractRow]) -> Vec<UnitBreakdown> {
    let mut buckets: BTreeMap<String, UnitBreakdown> = BTreeMap::new();
    for row in rows {
        let key = if row.ugr.trim().is_empty() {
            "Não informado".to_string()
        } else {
            row.ugr.trim().to_string()
        };
        let entry = buckets.entry(key.clone()).or_insert_with(|| UnitBreakdown {
            ugr: key,
            total_estimado: 0.0,
            executado_total: 0.0,
            empenhado_total: 0.0,
            saldo_previsto: 0.0,
            quantidade_contratos: 0,
        });
        entry.total_estimado += row.total_estimado;
        entry.executado_total += row.executado_total;
        entry.empenhado_total += row.empenhado_total;
        entry.saldo_previsto += row.saldo_previsto;
        entry.quantidade_contratos += 1;
    }
    buckets.into_values().collect()
}

// ============================================================================
// MONTHLY SERIES
// ============================================================================

/// Month totals across the given rows, one entry per detected month.
pub fn monthly_totals(rows: &[ContractRow], months: &[MonthInfo]) -> Vec<f64> {
    (0..months.len())
        .map(|index| {
            rows.iter()
                .map(|row| row.months.get(index).copied().unwrap_or(0.0))
                .sum()
        })
        .collect()
}

// ============================================================================
// EXPIRING / EXPIRED LISTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::Warning => "🟠",
            Severity::Info => "🔵",
        }
    }
}

/// One entry of the expiring or expired list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDeadline {
    pub descricao: String,
    pub ugr: String,
    pub pi: String,
    pub contrato: String,
    pub status: String,
    pub vigencia: String,
    pub dias: Option<i64>,
    pub motivo: String,
    pub severity: Severity,
    pub icon: String,
    pub lifecycle: LifecycleStatus,
}

fn deadline_entry(row: &ContractRow, today: NaiveDate, severity: Severity, motivo: String) -> ContractDeadline {
    ContractDeadline {
        descricao: row.descricao.clone(),
        ugr: row.ugr.clone(),
        pi: row.pi.clone(),
        contrato: row.contrato.clone(),
        status: row.status.clone(),
        vigencia: row.vigencia_str(),
        dias: days_until_end(row, today),
        motivo,
        icon: severity.icon().to_string(),
        severity,
        lifecycle: lifecycle_status(row.vigencia, today),
    }
}

/// Splits contracts into expiring-soon and already-expired lists, most
/// urgent first, capped at `CONTRACT_LIST_LIMIT`.
pub fn split_deadlines(
    rows: &[ContractRow],
    today: NaiveDate,
    thresholds: &Thresholds,
) -> (Vec<ContractDeadline>, Vec<ContractDeadline>) {
    let mut expiring = Vec::new();
    let mut expired = Vec::new();

    for row in rows {
        match days_until_end(row, today) {
            Some(delta) if delta < 0 => expired.push(deadline_entry(
                row,
                today,
                Severity::Critical,
                format!("Contrato vencido há {} dias.", -delta),
            )),
            Some(delta) if delta <= thresholds.expiring_window_days => {
                expiring.push(deadline_entry(
                    row,
                    today,
                    Severity::Warning,
                    format!("Contrato vence em {} dias.", delta),
                ))
            }
            Some(_) => {}
            None => {
                if status_says_expired(&row.status) {
                    expired.push(deadline_entry(
                        row,
                        today,
                        Severity::Critical,
                        "Contrato com status vencido e sem data de vigência.".to_string(),
                    ));
                }
            }
        }
    }

    // Expiring: fewest days left first. Expired: most recent first.
    expiring.sort_by_key(|entry| entry.dias.unwrap_or(i64::MAX));
    expired.sort_by_key(|entry| -entry.dias.unwrap_or(i64::MIN));
    expiring.truncate(CONTRACT_LIST_LIMIT);
    expired.truncate(CONTRACT_LIST_LIMIT);
    (expiring, expired)
}

// ============================================================================
// ALERTS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub descricao: String,
    pub ugr: String,
    pub pi: String,
    pub status: String,
    pub vigencia: String,
    pub motivo: String,
    pub severity: String,
    pub icon: String,
}

/// Per-contract alerts ordered by severity: expired status, expiring soon,
/// low remaining balance, execution above the expected pace, and missing
/// committed amounts.
pub fn build_alerts(
    rows: &[ContractRow],
    months: &[MonthInfo],
    today: NaiveDate,
    thresholds: &Thresholds,
) -> Vec<Alert> {
    let months_elapsed = months
        .iter()
        .filter(|info| info.first_day <= today)
        .count()
        .max(1);

    let mut alerts = Vec::new();
    for row in rows {
        let mut motivos: Vec<String> = Vec::new();
        let mut severity = "info";
        let mut icon = "🔵";

        let status_upper = row.status.trim().to_uppercase();
        let delta = days_until_end(row, today);

        let overdue = delta.map_or(false, |d| d < 0)
            || (!status_upper.is_empty() && status_upper != "NO PRAZO");
        if overdue {
            motivos.push("Contrato vencido ou status fora de prazo.".to_string());
            severity = "critical";
            icon = "🔴";
        }

        if let Some(d) = delta {
            if (0..=thresholds.expiring_window_days).contains(&d) {
                motivos.push(format!("Contrato vence em {} dias.", d));
                if severity != "critical" {
                    severity = "warning";
                    icon = "🟠";
                }
            }
        }

        if row.total_estimado > 0.0
            && row.saldo_previsto <= row.total_estimado * thresholds.low_balance_pct
        {
            motivos.push("Saldo previsto abaixo do limite de atenção.".to_string());
            if severity != "critical" && severity != "warning" {
                severity = "attention";
                icon = "⚠️";
            }
        }

        if row.valor_mensal > 0.0 {
            let expected = row.valor_mensal * months_elapsed as f64 * thresholds.high_execution_pct;
            if row.executado_total > expected {
                motivos.push("Execução acima do esperado para o período.".to_string());
                if severity != "critical" && severity != "warning" {
                    severity = "purple";
                    icon = "🟣";
                }
            }
        }

        if row.empenhado_total.abs() < 1e-6 {
            motivos.push("Empenhado ausente (RAP/Empenho não registrado).".to_string());
        }

        if !motivos.is_empty() {
            alerts.push(Alert {
                descricao: row.descricao.clone(),
                ugr: row.ugr.clone(),
                pi: row.pi.clone(),
                status: row.status.clone(),
                vigencia: row.vigencia_str(),
                motivo: motivos.join(" "),
                severity: severity.to_string(),
                icon: icon.to_string(),
            });
        }
    }

    let order = |severity: &str| match severity {
        "critical" => 0,
        "warning" => 1,
        "purple" => 2,
        "attention" => 3,
        _ => 4,
    };
    alerts.sort_by_key(|alert| order(&alert.severity));
    alerts
}

// ============================================================================
// HEATMAP
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapRow {
    pub descricao: String,
    pub values: Vec<f64>,
    /// True on the vigency-end month when it falls inside the current year.
    pub highlights: Vec<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Heatmap {
    pub rows: Vec<HeatmapRow>,
    pub months: Vec<MonthLabel>,
    pub max_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthLabel {
    pub key: String,
    pub label: String,
}

/// `active_indexes` selects which of the dataset's months (by position in
/// each row's `months` vector) participate; rows index their month values
/// against the full dataset list, so the caller passes original positions.
pub fn build_heatmap(
    rows: &[ContractRow],
    months: &[MonthInfo],
    active_indexes: &[usize],
    today: NaiveDate,
) -> Heatmap {
    let active: Vec<(usize, &MonthInfo)> = active_indexes
        .iter()
        .filter_map(|&index| months.get(index).map(|info| (index, info)))
        .collect();
    let month_labels: Vec<MonthLabel> = active
        .iter()
        .map(|(_, info)| MonthLabel {
            key: info.key.clone(),
            label: info.label.clone(),
        })
        .collect();

    if rows.is_empty() || active.is_empty() {
        return Heatmap {
            rows: Vec::new(),
            months: month_labels,
            max_value: 0.0,
        };
    }

    // Top descriptions by executed value.
    let mut by_description: BTreeMap<String, Vec<&ContractRow>> = BTreeMap::new();
    for row in rows {
        by_description
            .entry(row.descricao.clone())
            .or_default()
            .push(row);
    }
    let mut ranked: Vec<(String, f64)> = by_description
        .iter()
        .map(|(descricao, group)| {
            (
                descricao.clone(),
                group.iter().map(|r| r.executado_total).sum(),
            )
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(HEATMAP_LIMIT);

    let mut max_value = 0.0f64;
    let mut heatmap_rows = Vec::new();
    for (descricao, _) in &ranked {
        let group = &by_description[descricao];
        let mut values = Vec::with_capacity(active.len());
        let mut highlights = Vec::with_capacity(active.len());
        for &(index, info) in &active {
            let total: f64 = group
                .iter()
                .map(|row| row.months.get(index).copied().unwrap_or(0.0))
                .sum();
            max_value = max_value.max(total);
            values.push(total);

            let highlight = group.iter().any(|row| match row.vigencia {
                Some(end) => {
                    end.year() == today.year()
                        && end.year() == info.first_day.year()
                        && end.month() == info.first_day.month()
                }
                None => false,
            });
            highlights.push(highlight);
        }
        heatmap_rows.push(HeatmapRow {
            descricao: descricao.clone(),
            values,
            highlights,
        });
    }

    Heatmap {
        rows: heatmap_rows,
        months: month_labels,
        max_value,
    }
}
