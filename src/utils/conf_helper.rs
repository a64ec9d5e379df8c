use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tokio::fs;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::models::dashboard_model::DashboardConfig;

static CONFIG_CACHE: OnceLock<DashboardConfig> = OnceLock::new();

const DEFAULT_CONFIG_PATH: &str = "dashboard.json";
const CONFIG_PATH_ENV: &str = "PM_DASHBOARD_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file read error {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid stream settings: {0}")]
    Invalid(#[from] pm_stream::StreamError),

    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("config already initialized")]
    AlreadyInitialized,
}

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Reads and validates the config file. A missing file yields the built-in
/// defaults.
pub async fn load_config(path: &Path) -> Result<DashboardConfig, ConfigError> {
    let config = match fs::read_to_string(path).await {
        Ok(data) => serde_json::from_str::<DashboardConfig>(&data)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} not found, using built-in defaults", path.display());
            DashboardConfig::default()
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    config.stream.validate()?;
    Ok(config)
}

pub async fn init_config_and_bind() -> Result<TcpListener, ConfigError> {
    let mut config = load_config(&config_path()).await?;

    let bind_addr = format!("{}:{}", config.connection.ip, config.connection.port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|source| ConfigError::Bind {
            addr: bind_addr.clone(),
            source,
        })?;

    let actual_port = listener
        .local_addr()
        .map_err(|source| ConfigError::Bind {
            addr: bind_addr,
            source,
        })?
        .port();

    // Port 0 binds an ephemeral port; report the real one.
    config.connection.port = actual_port;

    CONFIG_CACHE
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;

    info!("Config initialized with port: {}", actual_port);

    Ok(listener)
}

pub fn get_cached_config() -> &'static DashboardConfig {
    CONFIG_CACHE.get().expect("Config not initialized")
}
