use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WearError {
    #[error(transparent)]
    Core(#[from] superbai_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid snapshot {path}: {reason}")]
    Snapshot { path: String, reason: String },
    #[error("Payload is not a valid bookings list: {0}")]
    MalformedPayload(String),
}
