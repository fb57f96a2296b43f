//! FILENAME: core/dashboard-engine/src/tests.rs
//! PURPOSE: Consolidated scenario tests for the dashboard engine.

use crate::columns::MonthInfo;
use crate::dataset::{ContractsDataset, DashboardFilters};
use crate::derive::{
    compute_kpis, lifecycle_status, split_deadlines, ugr_analysis, LifecycleStatus, Thresholds,
};
use crate::normalize::ContractRow;
use crate::scenario::{apply_scenario, ScenarioAdjustment, ScenarioField, ScenarioRequest};
use crate::snapshot::projection_payload;
use crate::view::{build_view, DashboardQuery};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The two-contract fixture of the S5/S6 scenarios: estimated {1000, 500},
/// executed {400, 500}, UGR {X, Y}, vigency ends 2024-12-31 and 2026-06-30.
fn fixture_rows() -> Vec<ContractRow> {
    let mut first = ContractRow {
        descricao: "Limpeza".into(),
        ugr: "X".into(),
        pi: "P1".into(),
        status: "NO PRAZO".into(),
        vigencia: Some(date(2024, 12, 31)),
        total_estimado: 1000.0,
        executado_total: 400.0,
        saldo_previsto: 600.0,
        execucao_pct: 40.0,
        ..ContractRow::default()
    };
    first.empenhado_total = 400.0;
    let mut second = ContractRow {
        descricao: "Vigilância".into(),
        ugr: "Y".into(),
        pi: "P2".into(),
        status: "NO PRAZO".into(),
        vigencia: Some(date(2026, 6, 30)),
        total_estimado: 500.0,
        executado_total: 500.0,
        saldo_previsto: 0.0,
        execucao_pct: 100.0,
        ..ContractRow::default()
    };
    second.empenhado_total = 500.0;
    vec![first, second]
}

fn fixture_dataset() -> ContractsDataset {
    ContractsDataset {
        id: "cd-1-test".into(),
        name: "contratos.xlsx".into(),
        created_at: Utc::now(),
        rows: fixture_rows(),
        months: vec![
            MonthInfo::from_date(date(2025, 1, 1), "2025-01"),
            MonthInfo::from_date(date(2025, 2, 1), "2025-02"),
        ],
        warnings: Vec::new(),
        column_map: BTreeMap::new(),
        raw_rows: Vec::new(),
        raw_columns: Vec::new(),
    }
}

// ============================================================================
// S5 - CONTRACTS NORMALIZER DERIVATIONS
// ============================================================================

#[test]
fn s5_kpis_and_classification() {
    let rows = fixture_rows();
    let kpis = compute_kpis(&rows, today(), &Thresholds::default());

    assert_eq!(kpis.total_estimado, 1500.0);
    assert_eq!(kpis.executado, 900.0);
    assert!((kpis.execucao_percentual - 60.0).abs() < 1e-9);
    assert_eq!(kpis.contratos_vencidos, 1);
    assert_eq!(kpis.contratos_vencendo, 0);
    assert_eq!(kpis.saldo, 600.0);

    // Lifecycle: X ended last year, Y ends next year.
    assert_eq!(
        lifecycle_status(rows[0].vigencia, today()),
        LifecycleStatus::ExpiredPrevious
    );
    assert_eq!(
        lifecycle_status(rows[1].vigencia, today()),
        LifecycleStatus::Future
    );
}

#[test]
fn lifecycle_covers_every_state() {
    let t = today();
    assert_eq!(lifecycle_status(None, t), LifecycleStatus::NoDate);
    assert_eq!(
        lifecycle_status(Some(date(2026, 1, 1)), t),
        LifecycleStatus::Future
    );
    assert_eq!(
        lifecycle_status(Some(date(2025, 6, 1)), t),
        LifecycleStatus::OnTrack
    );
    assert_eq!(
        lifecycle_status(Some(date(2025, 3, 15)), t),
        LifecycleStatus::OnTrack
    );
    assert_eq!(
        lifecycle_status(Some(date(2025, 2, 1)), t),
        LifecycleStatus::ExpiredCurrent
    );
    assert_eq!(
        lifecycle_status(Some(date(2024, 12, 31)), t),
        LifecycleStatus::ExpiredPrevious
    );
}

#[test]
fn expiring_window_is_inclusive() {
    let mut rows = fixture_rows();
    rows[1].vigencia = Some(today() + chrono::Duration::days(60));
    let kpis = compute_kpis(&rows, today(), &Thresholds::default());
    assert_eq!(kpis.contratos_vencendo, 1);

    rows[1].vigencia = Some(today() + chrono::Duration::days(61));
    let kpis = compute_kpis(&rows, today(), &Thresholds::default());
    assert_eq!(kpis.contratos_vencendo, 0);
}

#[test]
fn ugr_analysis_counts_active_and_expired() {
    let analysis = ugr_analysis(&fixture_rows(), today());
    let x = analysis.iter().find(|u| u.ugr == "X").unwrap();
    let y = analysis.iter().find(|u| u.ugr == "Y").unwrap();

    assert_eq!(x.contratos_expirados, 1);
    assert_eq!(x.contratos_ativos, 0);
    assert_eq!(x.total_estimado, 1000.0);
    assert!((x.percentual_execucao - 40.0).abs() < 1e-9);

    assert_eq!(y.contratos_ativos, 1);
    assert_eq!(y.contratos_expirados, 0);
}

#[test]
fn expired_status_without_date_counts_as_expired() {
    let mut rows = fixture_rows();
    rows[0].vigencia = None;
    rows[0].status = "VENCIDO".into();
    let kpis = compute_kpis(&rows, today(), &Thresholds::default());
    assert_eq!(kpis.contratos_vencidos, 1);

    // "VENCENDO" is not expired.
    rows[0].status = "VENCENDO".into();
    let kpis = compute_kpis(&rows, today(), &Thresholds::default());
    assert_eq!(kpis.contratos_vencidos, 0);
}

#[test]
fn deadline_lists_are_ordered_by_urgency() {
    let mut rows = fixture_rows();
    rows[0].vigencia = Some(today() + chrono::Duration::days(30));
    rows[1].vigencia = Some(today() + chrono::Duration::days(5));
    let (expiring, expired) = split_deadlines(&rows, today(), &Thresholds::default());

    assert_eq!(expired.len(), 0);
    assert_eq!(expiring.len(), 2);
    assert_eq!(expiring[0].dias, Some(5));
    assert_eq!(expiring[1].dias, Some(30));
    assert!(expiring[0].motivo.contains("5 dias"));
}

// ============================================================================
// S6 - SCENARIO SIMULATION
// ============================================================================

#[test]
fn s6_scenario_shifts_executed_without_touching_base() {
    let rows = fixture_rows();
    let base = compute_kpis(&rows, today(), &Thresholds::default());

    let request = ScenarioRequest {
        adjustments: vec![ScenarioAdjustment {
            ugr: "X".into(),
            field: ScenarioField::Executed,
            delta: 100.0,
        }],
    };
    let scenario = apply_scenario(&base, &rows, &request);

    assert_eq!(scenario.delta_executado, 100.0);
    assert_eq!(scenario.delta_planejado, 0.0);
    assert_eq!(scenario.delta_empenhado, 0.0);

    // Base untouched, scenario KPIs shifted.
    assert_eq!(base.executado, 900.0);
    assert_eq!(scenario.kpis.executado, 1000.0);
    assert_eq!(scenario.kpis.total_estimado, 1500.0);
    assert!((scenario.kpis.execucao_percentual - 1000.0 / 1500.0 * 100.0).abs() < 1e-9);
}

#[test]
fn scenario_ignores_unknown_ugrs_and_zero_deltas() {
    let rows = fixture_rows();
    let base = compute_kpis(&rows, today(), &Thresholds::default());
    let request = ScenarioRequest {
        adjustments: vec![
            ScenarioAdjustment {
                ugr: "Z".into(),
                field: ScenarioField::Executed,
                delta: 100.0,
            },
            ScenarioAdjustment {
                ugr: "X".into(),
                field: ScenarioField::Estimated,
                delta: 0.0,
            },
        ],
    };
    let scenario = apply_scenario(&base, &rows, &request);
    assert!(scenario.adjustments.is_empty());
    assert_eq!(scenario.kpis, base);
}

// ============================================================================
// VIEW AND PROJECTION
// ============================================================================

#[test]
fn view_assembles_all_blocks() {
    let dataset = fixture_dataset();
    let query = DashboardQuery::default();
    let view = build_view(
        &dataset,
        vec![dataset.summary()],
        &query,
        today(),
        &Thresholds::default(),
    );

    assert_eq!(view.dataset_id, "cd-1-test");
    assert_eq!(view.kpis.total_estimado, 1500.0);
    assert_eq!(view.unit_breakdown.len(), 2);
    assert_eq!(view.table.rows.len(), 2);
    assert_eq!(view.charts.planejado_empenhado_executado.mode, "total");
    assert_eq!(
        view.charts.planejado_empenhado_executado.datasets.executado,
        vec![900.0]
    );
    assert_eq!(view.filter_options.ugr, vec!["X", "Y"]);
    assert_eq!(view.config.limite_dias_vencimento, 60);
}

#[test]
fn view_filters_restrict_every_block() {
    let dataset = fixture_dataset();
    let query = DashboardQuery {
        filters: DashboardFilters {
            ugr: vec!["X".into()],
            ..DashboardFilters::default()
        },
        ..DashboardQuery::default()
    };
    let view = build_view(
        &dataset,
        vec![dataset.summary()],
        &query,
        today(),
        &Thresholds::default(),
    );
    assert_eq!(view.kpis.total_estimado, 1000.0);
    assert_eq!(view.table.rows.len(), 1);
    assert_eq!(view.unit_breakdown.len(), 1);
}

#[test]
fn monthly_chart_mode_spreads_planned_values() {
    let dataset = fixture_dataset();
    let query = DashboardQuery {
        chart_mode: Some("monthly".into()),
        ..DashboardQuery::default()
    };
    let view = build_view(
        &dataset,
        vec![dataset.summary()],
        &query,
        today(),
        &Thresholds::default(),
    );
    let chart = &view.charts.planejado_empenhado_executado;
    assert_eq!(chart.mode, "monthly");
    assert_eq!(chart.labels.len(), 2);
    assert_eq!(chart.datasets.planejado, vec![750.0, 750.0]);
}

#[test]
fn projection_has_the_integration_schema() {
    let dataset = fixture_dataset();
    let payload = projection_payload(&dataset, today(), &Thresholds::default());

    let kpis = payload.get("kpis").unwrap();
    assert_eq!(kpis.get("total_anual_estimado").unwrap(), 1500.0);
    assert_eq!(kpis.get("count_expired_contracts").unwrap(), 1);
    assert_eq!(kpis.get("count_expiring_contracts").unwrap(), 0);

    let records = payload
        .get("raw_data_for_filters")
        .and_then(|v| v.as_array())
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("UGR").and_then(|v| v.as_str()), Some("X"));
    assert!(records[0].get("Total_Necessario").is_some());

    assert!(payload.get("ugr_analysis").unwrap().as_array().unwrap().len() == 2);
    assert!(payload.get("monthly_consumption").unwrap().as_array().unwrap().len() == 2);
    assert_eq!(
        payload
            .get("expired_contracts_list")
            .unwrap()
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn projection_writes_atomically() {
    let dataset = fixture_dataset();
    let payload = projection_payload(&dataset, today(), &Thresholds::default());
    let dir = std::env::temp_dir().join(format!("dash-proj-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("dashboard_data.json");

    crate::snapshot::write_projection(&path, &payload).unwrap();
    let body = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(parsed.get("kpis").is_some());
    assert!(!path.with_extension("tmp").exists());

    std::fs::remove_dir_all(&dir).ok();
}
