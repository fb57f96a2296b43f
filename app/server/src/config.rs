//! FILENAME: app/server/src/config.rs
//! PURPOSE: Environment-based server configuration.
//! CONTEXT: Everything is optional except a parseable PORT; a bad port or
//! flag is a boot failure (exit code 2), not a silent default.

use dashboard_engine::Thresholds;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8050;
pub const DEFAULT_DATA_PATH: &str = "dashboard_data.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT inválida: '{0}'")]
    InvalidPort(String),

    #[error("Valor inválido para {name}: '{value}'")]
    InvalidFlag { name: String, value: String },

    #[error("Valor numérico inválido para {name}: '{value}'")]
    InvalidNumber { name: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Identifier handed to the workbook provider; None disables remote
    /// refresh entirely.
    pub drive_file_id: Option<String>,
    /// Whether to pull the primary workbook at startup.
    pub boot_sync: bool,
    /// When set, manual refresh requires a byte-identical X-Portal-Token.
    pub sync_token: Option<String>,
    /// Where the dashboard projection file is written.
    pub dashboard_data_path: PathBuf,
    pub thresholds: Thresholds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            drive_file_id: None,
            boot_sync: true,
            sync_token: None,
            dashboard_data_path: PathBuf::from(DEFAULT_DATA_PATH),
            thresholds: Thresholds::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Ok(raw) = std::env::var("PORT") {
            config.port = raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?;
        }

        config.drive_file_id = std::env::var("CPOR_DRIVE_FILE_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if let Ok(raw) = std::env::var("CPOR_DRIVE_BOOT_SYNC") {
            config.boot_sync = parse_flag("CPOR_DRIVE_BOOT_SYNC", &raw)?;
        }

        config.sync_token = std::env::var("CPOR_DRIVE_SYNC_TOKEN")
            .ok()
            .filter(|v| !v.is_empty());

        if let Ok(raw) = std::env::var("DASHBOARD_DATA_PATH") {
            if !raw.trim().is_empty() {
                config.dashboard_data_path = PathBuf::from(raw.trim());
            }
        }

        if let Ok(raw) = std::env::var("LIMITE_DIAS_VENCIMENTO") {
            config.thresholds.expiring_window_days =
                parse_number("LIMITE_DIAS_VENCIMENTO", &raw)? as i64;
        }
        if let Ok(raw) = std::env::var("PCT_SALDO_BAIXO") {
            config.thresholds.low_balance_pct = parse_number("PCT_SALDO_BAIXO", &raw)?;
        }
        if let Ok(raw) = std::env::var("PCT_EXEC_ALTA") {
            config.thresholds.high_execution_pct = parse_number("PCT_EXEC_ALTA", &raw)?;
        }

        Ok(config)
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" | "" => Ok(true),
        _ => Err(ConfigError::InvalidFlag {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_number(name: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidNumber {
            name: name.to_string(),
            value: raw.to_string(),
        })
}
