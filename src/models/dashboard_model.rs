use serde::{Deserialize, Serialize};
use std::time::Duration;

use pm_stream::core::constants::{BACKFILL_SPACING, TICK_PERIOD, WINDOW_CAPACITY};
use pm_stream::{validate_signals, SignalConfig, StreamOptions};

use crate::models::fleet_model::FleetCatalog;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub name: String,
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub connection: Connection,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub records: Option<RecordStoreConfig>,
    #[serde(default)]
    pub fleet: Option<FleetCatalog>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            name: "Predictive Maintenance Monitor".to_string(),
            id: "pm-dashboard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Live equipment health sample streams".to_string(),
            connection: Connection {
                ip: "127.0.0.1".to_string(),
                port: 0,
            },
            stream: StreamSettings::default(),
            records: None,
            fleet: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub capacity: usize,
    pub tick_period_ms: u64,
    pub backfill_spacing_ms: u64,
    pub seed: Option<u64>,
    pub signals: Vec<SignalConfig>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            capacity: WINDOW_CAPACITY,
            tick_period_ms: TICK_PERIOD.as_millis() as u64,
            backfill_spacing_ms: BACKFILL_SPACING.as_millis() as u64,
            seed: None,
            signals: SignalConfig::presets(),
        }
    }
}

impl StreamSettings {
    pub fn options(&self) -> StreamOptions {
        StreamOptions {
            capacity: self.capacity,
            tick_period: Duration::from_millis(self.tick_period_ms),
            backfill_spacing: Duration::from_millis(self.backfill_spacing_ms),
            seed: self.seed,
        }
    }

    pub fn validate(&self) -> pm_stream::Result<()> {
        self.options().validate()?;
        validate_signals(&self.signals)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordStoreConfig {
    pub url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
}
