//! Core error types for autoplan-core.
//!
//! Scheduling itself never fails: missing or odd task data falls back to
//! documented defaults. Errors only surface at the edges, when loading a
//! configuration file or when the host hands over records that break the
//! input contract.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for autoplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task records rejected at the pipeline boundary
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to write the configuration file
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Validation errors for host-supplied task records.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Task without a usable identifier
    #[error("Task at position {index} has no identifier")]
    MissingId { index: usize },

    /// Two tasks in one batch share an identifier
    #[error("Duplicate task identifier '{id}'")]
    DuplicateId { id: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
