//! Error types for the carbon-aware scheduler

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Task input rejected (non-positive duration, unknown tier, empty name)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Carbon data source unreachable or returned nothing usable
    #[error("Carbon data unavailable: {0}")]
    DataUnavailable(String),

    /// Illegal job state transition
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown job id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration is invalid or could not be loaded
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP request to a carbon data feed failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Short machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::ValidationError(_) => "validation_failed",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            _ => "internal",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
