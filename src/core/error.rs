// Error handling for stream configuration

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Signal not found: {0}")]
    SignalNotFound(String),

    #[error("Duplicate signal id: {0}")]
    DuplicateSignal(String),
}
