//! FILENAME: app/server/src/main.rs

use portal_server::config::Config;
use portal_server::drive::SyncDirProvider;
use portal_server::state::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_server=info,info".into()),
        )
        .with_target(false)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "configuração inválida");
            std::process::exit(2);
        }
    };

    let port = config.port;
    let state = AppState::new(config, Arc::new(SyncDirProvider::default()));

    // Optional startup sync of the primary contracts workbook.
    if state.config.boot_sync {
        if let Some(file_id) = state.config.drive_file_id.clone() {
            match state.provider.fetch(&file_id) {
                Ok((filename, bytes)) => {
                    match portal_server::handlers::dashboard::ingest_on_boot(&state, filename, &bytes) {
                        Ok(dataset_id) => info!(dataset = %dataset_id, "primary workbook synced at boot"),
                        Err(err) => warn!(%err, "boot sync: workbook rejected"),
                    }
                }
                Err(err) => warn!(%err, "boot sync: fetch failed"),
            }
        }
    }

    let app = portal_server::create_app(state);
    let address = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, %address, "não foi possível abrir a porta");
            std::process::exit(2);
        }
    };
    info!(%address, "portal server listening");

    if let Err(err) = axum::serve(listener, app).await {
        error!(%err, "server error");
        std::process::exit(1);
    }
}
