//! FILENAME: core/dashboard-engine/src/scenario.rs
//! PURPOSE: What-if scenario simulation over the aggregated base numbers.
//! CONTEXT: Adjustments target a UGR and one of the three money fields.
//! Deltas apply after base aggregation: the base KPIs stay untouched and
//! the scenario block reports the accumulated deltas plus a shifted KPI
//! copy.

use crate::derive::{safe_percent, Kpis};
use crate::normalize::ContractRow;
use serde::{Deserialize, Serialize};

/// The field an adjustment shifts. Accepts the short spelling and the
/// canonical column names older clients send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioField {
    #[serde(rename = "estimated", alias = "total_estimado")]
    Estimated,
    #[serde(rename = "executed", alias = "executado_total")]
    Executed,
    #[serde(rename = "committed", alias = "empenhado_total")]
    Committed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAdjustment {
    pub ugr: String,
    pub field: ScenarioField,
    #[serde(default)]
    pub delta: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioRequest {
    #[serde(default)]
    pub adjustments: Vec<ScenarioAdjustment>,
}

/// The scenario block of a dashboard view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub adjustments: Vec<ScenarioAdjustment>,
    pub delta_planejado: f64,
    pub delta_executado: f64,
    pub delta_empenhado: f64,
    /// KPIs with the deltas applied on top of the base aggregation.
    pub kpis: Kpis,
}

/// Applies the adjustments on top of the already-aggregated base KPIs.
/// Adjustments naming a UGR absent from the filtered rows are ignored, as
/// are zero deltas.
pub fn apply_scenario(
    base: &Kpis,
    rows: &[ContractRow],
    request: &ScenarioRequest,
) -> ScenarioSummary {
    let mut applied = Vec::new();
    let mut delta_planejado = 0.0;
    let mut delta_executado = 0.0;
    let mut delta_empenhado = 0.0;

    for adjustment in &request.adjustments {
        let ugr = adjustment.ugr.trim();
        if ugr.is_empty() || adjustment.delta == 0.0 {
            continue;
        }
        let known = rows
            .iter()
            .any(|row| row.ugr.trim().eq_ignore_ascii_case(ugr));
        if !known {
            continue;
        }
        match adjustment.field {
            ScenarioField::Estimated => delta_planejado += adjustment.delta,
            ScenarioField::Executed => delta_executado += adjustment.delta,
            ScenarioField::Committed => delta_empenhado += adjustment.delta,
        }
        applied.push(adjustment.clone());
    }

    let total_estimado = base.total_estimado + delta_planejado;
    let executado = base.executado + delta_executado;
    let kpis = Kpis {
        total_estimado,
        executado,
        empenhado: base.empenhado + delta_empenhado,
        saldo: (total_estimado - executado).max(0.0),
        execucao_percentual: safe_percent(executado, total_estimado),
        contratos_vencendo: base.contratos_vencendo,
        contratos_vencidos: base.contratos_vencidos,
    };

    ScenarioSummary {
        adjustments: applied,
        delta_planejado,
        delta_executado,
        delta_empenhado,
        kpis,
    }
}
