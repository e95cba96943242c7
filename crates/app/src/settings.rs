//! Handles settings for the application. Configuration is read from
//! `settings.toml` (optional) and `FORECOURT__*` environment variables, e.g.
//! `FORECOURT__LEDGER__SUMMARY_TOLERANCE=750`.
//!
//! See `settings.example.toml` for the configuration.

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

const DEFAULT_SETTINGS_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("./forecourt.db".to_string())
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => String::from("sqlite::memory:"),
            Self::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

/// Station policy passed into the ledger.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ledger {
    pub lock_timeout_ms: u64,
    /// Flat tolerance of the daily safe summary.
    pub summary_tolerance: Decimal,
    pub cash_tolerance_percent: Decimal,
    pub cash_tolerance_flat: Decimal,
    pub tank_tolerance_percent: Decimal,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            summary_tolerance: Decimal::from(500),
            cash_tolerance_percent: Decimal::new(3, 1),
            cash_tolerance_flat: Decimal::from(200),
            tank_tolerance_percent: Decimal::new(5, 1),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub ledger: Ledger,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_SETTINGS_PATH)).required(false))
            .add_source(Environment::with_prefix("FORECOURT").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
