//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration could not be loaded
    #[error("Failed to load configuration from {path}: {message}")]
    ConfigLoad { path: String, message: String },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Trigger parameters rejected before any delivery
    #[error("Broadcast rejected: {message}")]
    Usage { message: String },

    /// Report output could not be opened
    #[error("Failed to open report output {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Metrics exporter could not be started
    #[error("Failed to start metrics exporter: {message}")]
    Metrics { message: String },

    /// Interrupted by a signal
    #[error("Broadcast interrupted by shutdown signal")]
    Interrupted,

    /// Batch error other than usage
    #[error(transparent)]
    Dispatch(#[from] dispatcher::DispatcherError),

    /// JSON output could not be produced
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Contract error (enumeration, config)
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl CliError {
    pub fn config_load(path: &Path, message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn output(path: &Path, source: std::io::Error) -> Self {
        Self::Output {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
