//! Decoding capability abstraction.
//!
//! A decoding capability is anything that watches a live input (a camera
//! feed, a keyboard-wedge scanner) and emits the text of each code it
//! decodes. The kiosk never looks inside one; it only drives the lifecycle
//! defined by [`DecodingCapability`].

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::ScannerConfig;

/// Errors raised by a decoding capability.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The capability failed to start.
    #[error("failed to start decoder: {0}")]
    StartFailed(String),

    /// The capability has already been started.
    #[error("decoder already started")]
    AlreadyStarted,

    /// The capability has not been started.
    #[error("decoder not started")]
    NotStarted,

    /// A transition was requested from the wrong state.
    #[error("cannot {operation} decoder while {state}")]
    InvalidState {
        /// The requested transition.
        operation: &'static str,
        /// The state the decoder was in.
        state: ScannerState,
    },

    /// Releasing the capability's resources failed.
    #[error("failed to clear decoder: {0}")]
    ClearFailed(String),
}

/// Result type for capability operations.
pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Lifecycle state of a decoding capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScannerState {
    /// Not constructed yet, or already cleared.
    #[default]
    NotStarted,
    /// Actively decoding input.
    Scanning,
    /// Running but not emitting decoded values.
    Paused,
}

impl std::fmt::Display for ScannerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Scanning => write!(f, "scanning"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// A value decoded from the live input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedValue {
    text: String,
    decoded_at: DateTime<Utc>,
}

impl DecodedValue {
    /// Wrap decoded text, stamping it with the current time.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            decoded_at: Utc::now(),
        }
    }

    /// The decoded text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// When the value was decoded.
    #[must_use]
    pub fn decoded_at(&self) -> DateTime<Utc> {
        self.decoded_at
    }

    /// Consume the value, returning the decoded text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.text
    }
}

impl std::fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// A source of decoded values with a pausable lifecycle.
///
/// Implementors own whatever device or stream they decode from. The kiosk
/// holds exactly one instance, starts it once per mount and clears it on
/// unmount.
#[async_trait::async_trait]
pub trait DecodingCapability: Send + std::fmt::Debug {
    /// The name of this capability (for logging).
    fn name(&self) -> &'static str;

    /// The current lifecycle state.
    fn state(&self) -> ScannerState;

    /// Start decoding and send every decoded value through `tx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the capability is already started or its input
    /// cannot be opened.
    fn start(&mut self, config: &ScannerConfig, tx: mpsc::Sender<DecodedValue>) -> Result<()>;

    /// Stop emitting values without releasing the input.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidState`] unless currently scanning.
    fn pause(&mut self) -> Result<()>;

    /// Resume emitting values after [`pause`](Self::pause).
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidState`] unless currently paused.
    fn resume(&mut self) -> Result<()>;

    /// Release the input. No value is sent after this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying resource could not be released
    /// cleanly.
    async fn clear(&mut self) -> Result<()>;
}
