//! Layered error definitions
//!
//! Categorized by source: config / session / delivery / enumeration / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Gateway Errors =====
    /// Session state for a destination exists but cannot be used
    #[error("session lookup failed for '{destination}': {message}")]
    SessionLookup {
        destination: String,
        message: String,
    },

    /// Transmission to a destination failed
    #[error("delivery to '{destination}' failed: {message}")]
    Delivery {
        destination: String,
        message: String,
    },

    // ===== Source Errors =====
    /// Backing store could not be enumerated
    #[error("destination enumeration failed for '{source_name}': {message}")]
    Enumeration {
        source_name: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create session lookup error
    pub fn session_lookup(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SessionLookup {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create delivery error
    pub fn delivery(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create enumeration error
    pub fn enumeration(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Enumeration {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
