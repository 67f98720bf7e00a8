//! Error types for cwtune

use thiserror::Error;

/// Main error type for cwtune
#[derive(Error, Debug)]
pub enum CwTuneError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Simulator error: {0}")]
    Simulator(String),

    #[error("Space error: {0}")]
    Space(String),

    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    #[error("State bucket {bucket} is outside the value table (0..{buckets})")]
    BucketOutOfRange { bucket: i64, buckets: usize },

    #[error("Action {action} is outside the value table (0..{actions})")]
    ActionOutOfRange { action: usize, actions: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type alias for cwtune operations
pub type Result<T> = std::result::Result<T, CwTuneError>;
