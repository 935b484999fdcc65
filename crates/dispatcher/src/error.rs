//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
///
/// Only pre-flight conditions surface here. Failures of individual delivery
/// units are recorded in the batch report and never returned.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Trigger parameters unusable, no work scheduled
    #[error("usage error: {message}")]
    Usage { message: String },

    /// Request field out of range
    #[error("invalid request field '{field}': {message}")]
    InvalidRequest { field: String, message: String },

    /// Another batch is active and the admission policy rejects
    #[error("a broadcast batch is already running")]
    BatchInProgress,

    /// Error from a collaborator contract
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }
}
