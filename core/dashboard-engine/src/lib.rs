//! FILENAME: core/dashboard-engine/src/lib.rs
//! Contracts dashboard engine.
//!
//! Turns uploaded contracts workbooks into normalized rows and derives the
//! dashboard surfaces: KPIs, per-UGR analysis, monthly consumption,
//! expiring/expired classification, alerts, heatmap, scenario simulation
//! and the on-disk projection consumed by the auxiliary dashboards.
//!
//! Layers:
//! - `columns`: canonical fields, aliases, month detection
//! - `normalize`: table -> contract rows (coercion, summary-row discard)
//! - `derive`: pure derivations over rows (always "today"-parameterized)
//! - `scenario`: post-aggregation what-if adjustments
//! - `dataset` / `store`: snapshots and the in-memory registry
//! - `view`: the full query response
//! - `snapshot`: the `dashboard_data.json` write-through projection

pub mod columns;
pub mod dataset;
pub mod derive;
pub mod error;
pub mod normalize;
pub mod scenario;
pub mod snapshot;
pub mod store;
pub mod view;

#[cfg(test)]
mod tests;

pub use columns::{parse_month_label, Field, MonthInfo};
pub use dataset::{ContractsDataset, ContractsSummary, DashboardFilters};
pub use derive::{
    compute_kpis, lifecycle_status, split_deadlines, ugr_analysis, Kpis, LifecycleStatus,
    Thresholds,
};
pub use error::DashboardError;
pub use normalize::{normalize_table, ContractRow, NormalizedContracts};
pub use scenario::{apply_scenario, ScenarioAdjustment, ScenarioField, ScenarioRequest};
pub use snapshot::{projection_payload, write_projection};
pub use store::ContractsStore;
pub use view::{build_view, DashboardQuery, DashboardView};
