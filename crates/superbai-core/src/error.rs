//! Error types for superbai-core

use thiserror::Error;

/// Result type alias using superbai-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in superbai-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Data layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid sync settings
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures reported by the wearable data layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Peer node is not reachable
    #[error("Node unreachable: {0}")]
    NodeUnreachable(String),

    /// Message could not be delivered
    #[error("Message send failed: {0}")]
    SendFailed(String),

    /// Node or data item query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Data layer was shut down
    #[error("Data layer closed")]
    Closed,
}

/// Result type for data layer calls
pub type TransportResult<T> = std::result::Result<T, TransportError>;
