//! FILENAME: app/server/src/state.rs
//! PURPOSE: Shared application state.
//! CONTEXT: One instance per process, created at boot and shared by every
//! handler. The stores own all mutable state; everything else is
//! configuration.

use crate::config::Config;
use crate::drive::WorkbookProvider;
use chrono::Utc;
use dashboard_engine::ContractsStore;
use model::DatasetStore;
use std::sync::Arc;

pub struct AppState {
    pub datasets: DatasetStore,
    pub contracts: ContractsStore,
    pub config: Config,
    pub provider: Arc<dyn WorkbookProvider>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn WorkbookProvider>) -> SharedState {
        Arc::new(AppState {
            datasets: DatasetStore::new(),
            contracts: ContractsStore::new(),
            config,
            provider,
        })
    }

    /// The engine never reads the clock; handlers inject today's date.
    pub fn today(&self) -> chrono::NaiveDate {
        Utc::now().date_naive()
    }
}
