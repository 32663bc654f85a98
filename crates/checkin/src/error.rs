//! Error types for checkin.
//!
//! This module defines the crate-wide error type. Lifecycle failures of the
//! decoding capability have their own [`CapabilityError`] and convert into
//! [`Error::Capability`] when they need to cross the kiosk boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::capability::CapabilityError;

/// The main error type for checkin operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// No check-in endpoint was configured.
    #[error("no check-in endpoint configured (set CHECKIN_API_URL or api.url in {path})")]
    MissingApiUrl {
        /// Config file that was consulted.
        path: PathBuf,
    },

    // === Endpoint Errors ===
    /// The HTTP request to the check-in endpoint failed.
    #[error("check-in request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Capability Errors ===
    /// The decoding capability failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    // === I/O Errors ===
    /// File system or stream operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Generic Errors ===
    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for checkin operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a timeout error for the named operation.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Check if this error came from talking to the check-in endpoint.
    ///
    /// These are the failures that surface to the user as a connection error.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Json(_) | Self::Timeout { .. })
    }
}
