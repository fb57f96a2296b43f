//! FILENAME: core/dashboard-engine/src/view.rs
//! PURPOSE: Assembles the full dashboard view for one query.
//! CONTEXT: The view is everything the front-end renders in one shot:
//! KPIs, alerts, charts, the detail table, per-unit breakdown, raw rows,
//! filter options and the scenario block. All of it derives from the
//! filtered rows; scenario deltas apply after aggregation and never touch
//! the base numbers.

use crate::dataset::{ContractsDataset, ContractsSummary, DashboardFilters};
use crate::derive::{
    build_alerts, build_heatmap, compute_kpis, monthly_totals, split_deadlines, unit_breakdown,
    Alert, ContractDeadline, Heatmap, Kpis, MonthLabel, Thresholds, UnitBreakdown,
};
use crate::normalize::ContractRow;
use crate::scenario::{apply_scenario, ScenarioRequest, ScenarioSummary};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dashboard query as posted by clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub filters: DashboardFilters,
    #[serde(default)]
    pub scenario: ScenarioRequest,
    /// `total` (default) or `monthly`.
    #[serde(default)]
    pub chart_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonDatasets {
    pub planejado: Vec<f64>,
    pub empenhado: Vec<f64>,
    pub executado: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonChart {
    pub mode: String,
    pub labels: Vec<String>,
    pub datasets: ComparisonDatasets,
}

#[derive(Debug, Clone, Serialize)]
pub struct Charts {
    #[serde(rename = "despesasUGR")]
    pub despesas_ugr: ChartSeries,
    #[serde(rename = "distribuicaoDescricao")]
    pub distribuicao_descricao: ChartSeries,
    #[serde(rename = "execucaoMensal")]
    pub execucao_mensal: ChartSeries,
    #[serde(rename = "planejadoEmpenhadoExecutado")]
    pub planejado_empenhado_executado: ComparisonChart,
    pub heatmap: Heatmap,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSlice {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub ugr: Vec<String>,
    pub pi: Vec<String>,
    pub descricao: Vec<String>,
    pub status: Vec<String>,
    pub cnpj: Vec<String>,
    pub month: Vec<MonthLabel>,
}

/// Threshold echo so the front-end renders the same limits the engine
/// applied.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEcho {
    pub limite_dias_vencimento: i64,
    pub pct_saldo_baixo: f64,
    pub pct_execucao_alta: f64,
}

impl From<&Thresholds> for ConfigEcho {
    fn from(thresholds: &Thresholds) -> Self {
        ConfigEcho {
            limite_dias_vencimento: thresholds.expiring_window_days,
            pct_saldo_baixo: thresholds.low_balance_pct,
            pct_execucao_alta: thresholds.high_execution_pct,
        }
    }
}

/// The complete dashboard response envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub dataset_id: String,
    pub name: String,
    pub datasets: Vec<ContractsSummary>,
    pub generated_at: String,
    pub warnings: Vec<String>,
    pub column_map: BTreeMap<String, String>,
    pub kpis: Kpis,
    pub alerts: Vec<Alert>,
    pub charts: Charts,
    pub table: TableSlice,
    pub unit_breakdown: Vec<UnitBreakdown>,
    pub expiring_contracts: Vec<ContractDeadline>,
    pub expired_contracts: Vec<ContractDeadline>,
    pub raw_data: Vec<serde_json::Value>,
    pub raw_columns: Vec<String>,
    pub filter_options: FilterOptions,
    pub scenario: ScenarioSummary,
    pub config: ConfigEcho,
}

/// Builds the view for one dataset and query.
pub fn build_view(
    dataset: &ContractsDataset,
    datasets: Vec<ContractsSummary>,
    query: &DashboardQuery,
    today: NaiveDate,
    thresholds: &Thresholds,
) -> DashboardView {
    let filtered = query.filters.apply(&dataset.rows);
    let chart_mode = normalize_chart_mode(query.chart_mode.as_deref());

    let kpis = compute_kpis(&filtered, today, thresholds);
    let alerts = build_alerts(&filtered, &dataset.months, today, thresholds);
    let (expiring, expired) = split_deadlines(&filtered, today, thresholds);
    let scenario = apply_scenario(&kpis, &filtered, &query.scenario);
    let charts = build_charts(&filtered, dataset, &query.filters, &chart_mode, today);

    let values = dataset.filter_values();
    let filter_options = FilterOptions {
        ugr: values.ugr,
        pi: values.pi,
        descricao: values.descricao,
        status: values.status,
        cnpj: values.cnpj,
        month: dataset
            .months
            .iter()
            .map(|info| MonthLabel {
                key: info.key.clone(),
                label: info.label.clone(),
            })
            .collect(),
    };

    DashboardView {
        dataset_id: dataset.id.clone(),
        name: dataset.name.clone(),
        datasets,
        generated_at: chrono::Utc::now().to_rfc3339(),
        warnings: dataset.warnings.clone(),
        column_map: dataset.column_map.clone(),
        kpis,
        alerts,
        charts,
        table: build_table(&filtered, &dataset.column_map),
        unit_breakdown: unit_breakdown(&filtered),
        expiring_contracts: expiring,
        expired_contracts: expired,
        raw_data: dataset.raw_rows.clone(),
        raw_columns: dataset.raw_columns.clone(),
        filter_options,
        scenario,
        config: thresholds.into(),
    }
}

fn normalize_chart_mode(mode: Option<&str>) -> String {
    match mode {
        Some(value) if value.eq_ignore_ascii_case("monthly") => "monthly".to_string(),
        _ => "total".to_string(),
    }
}

fn build_charts(
    filtered: &[ContractRow],
    dataset: &ContractsDataset,
    filters: &DashboardFilters,
    chart_mode: &str,
    today: NaiveDate,
) -> Charts {
    // Executed by UGR, top 8.
    let mut by_ugr: Vec<UnitBreakdown> = unit_breakdown(filtered);
    by_ugr.sort_by(|a, b| {
        b.executado_total
            .partial_cmp(&a.executado_total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    by_ugr.truncate(8);
    let despesas_ugr = ChartSeries {
        labels: by_ugr.iter().map(|u| u.ugr.clone()).collect(),
        values: by_ugr.iter().map(|u| u.executado_total).collect(),
    };

    // Executed by description, top 6 plus "Outros".
    let mut by_description: BTreeMap<String, f64> = BTreeMap::new();
    for row in filtered {
        *by_description.entry(row.descricao.clone()).or_default() += row.executado_total;
    }
    let mut ranked: Vec<(String, f64)> = by_description.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let rest: f64 = ranked.iter().skip(6).map(|(_, v)| v).sum();
    ranked.truncate(6);
    let mut labels: Vec<String> = ranked.iter().map(|(d, _)| d.clone()).collect();
    let mut values: Vec<f64> = ranked.iter().map(|(_, v)| *v).collect();
    if rest > 0.0 {
        labels.push("Outros".to_string());
        values.push(rest);
    }
    let distribuicao_descricao = ChartSeries { labels, values };

    // Monthly execution honoring the month filter.
    let active_months = filters.active_months(&dataset.months);
    let month_indexes: Vec<usize> = active_months
        .iter()
        .filter_map(|info| dataset.months.iter().position(|m| m.key == info.key))
        .collect();
    let all_totals = monthly_totals(filtered, &dataset.months);
    let execucao_mensal = ChartSeries {
        labels: active_months.iter().map(|m| m.label.clone()).collect(),
        values: month_indexes.iter().map(|&i| all_totals[i]).collect(),
    };

    // Planned x committed x executed, as one total bar or spread monthly.
    let total_planejado: f64 = filtered.iter().map(|r| r.total_estimado).sum();
    let total_empenhado: f64 = filtered.iter().map(|r| r.empenhado_total).sum();
    let total_executado: f64 = filtered.iter().map(|r| r.executado_total).sum();
    let planejado_empenhado_executado = if chart_mode == "monthly" && !active_months.is_empty() {
        let share = active_months.len() as f64;
        ComparisonChart {
            mode: "monthly".to_string(),
            labels: active_months.iter().map(|m| m.label.clone()).collect(),
            datasets: ComparisonDatasets {
                planejado: vec![total_planejado / share; active_months.len()],
                empenhado: vec![total_empenhado / share; active_months.len()],
                executado: month_indexes.iter().map(|&i| all_totals[i]).collect(),
            },
        }
    } else {
        ComparisonChart {
            mode: "total".to_string(),
            labels: vec!["Totais".to_string()],
            datasets: ComparisonDatasets {
                planejado: vec![total_planejado],
                empenhado: vec![total_empenhado],
                executado: vec![total_executado],
            },
        }
    };

    Charts {
        despesas_ugr,
        distribuicao_descricao,
        execucao_mensal,
        planejado_empenhado_executado,
        heatmap: build_heatmap(filtered, &dataset.months, &month_indexes, today),
    }
}

fn build_table(rows: &[ContractRow], column_map: &BTreeMap<String, String>) -> TableSlice {
    let label = |key: &str, fallback: &str| -> String {
        column_map
            .get(key)
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    };

    let columns = vec![
        ("descricao", label("descricao", "Descrição das despesas")),
        ("ugr", label("ugr", "UGR")),
        ("pi", label("pi", "PI 2025")),
        ("empenhado_total", "Empenhado Total".to_string()),
        ("executado_total", "Executado Total".to_string()),
        ("total_estimado", label("total_estimado", "Total estimado Anual")),
        ("saldo_previsto", label("saldo_previsto", "Saldo Previsto")),
        ("status", label("status", "Status do Contrato")),
        ("vigencia_str", label("vigencia", "Vigência")),
        ("cnpj", label("cnpj", "CNPJ")),
        ("processo", label("processo", "Processo")),
        ("contrato", label("contrato", "nº Contrato")),
        ("execucao_pct", label("execucao_pct", "Execução (%)")),
    ];

    let table_rows = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "descricao": row.descricao,
                "ugr": row.ugr,
                "pi": row.pi,
                "empenhado_total": row.empenhado_total,
                "executado_total": row.executado_total,
                "total_estimado": row.total_estimado,
                "saldo_previsto": row.saldo_previsto,
                "status": row.status,
                "vigencia_str": row.vigencia_str(),
                "cnpj": row.cnpj,
                "processo": row.processo,
                "contrato": row.contrato,
                "execucao_pct": row.execucao_pct,
            })
        })
        .collect();

    TableSlice {
        columns: columns
            .into_iter()
            .map(|(key, label)| TableColumn {
                key: key.to_string(),
                label,
            })
            .collect(),
        rows: table_rows,
    }
}
