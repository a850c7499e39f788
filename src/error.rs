//! Error types for the ranked-index engine

use thiserror::Error;

/// Result type alias for ranked-index operations
pub type Result<T> = std::result::Result<T, RankedIndexError>;

/// Error types that can occur in ranked-index operations.
///
/// Absence is never an error: lookups return `Option`, `bool` or empty
/// collections. These variants cover rejected input and configuration.
#[derive(Error, Debug)]
pub enum RankedIndexError {
    #[error("Non-finite metric for {id}: {value}")]
    NonFiniteMetric { id: String, value: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<toml::de::Error> for RankedIndexError {
    fn from(err: toml::de::Error) -> Self {
        RankedIndexError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for RankedIndexError {
    fn from(err: serde_json::Error) -> Self {
        RankedIndexError::SerializationError(err.to_string())
    }
}
