//! Scan controller.
//!
//! The controller owns the single decoding capability bound to the kiosk
//! viewport and drives its lifecycle. Lifecycle failures are logged and
//! swallowed here; none of them reach the event loop.
//!
//! [`ScanGate`] decides which decoded values are allowed to trigger a
//! check-in request.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::capability::{DecodedValue, DecodingCapability, ScannerState};
use crate::config::ScannerConfig;
use crate::error::Result;

/// Owns the decoding capability for the lifetime of one mount.
#[derive(Debug)]
pub struct ScanController {
    config: ScannerConfig,
    capability: Option<Box<dyn DecodingCapability>>,
}

impl ScanController {
    /// Create a controller with no capability attached.
    #[must_use]
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            capability: None,
        }
    }

    /// Construct and start the decoding capability.
    ///
    /// The factory is only invoked when no capability is attached yet; a
    /// second call is a no-op and returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the new capability fails to start. The controller
    /// stays uninitialized in that case.
    pub fn initialize<F>(&mut self, factory: F, tx: mpsc::Sender<DecodedValue>) -> Result<bool>
    where
        F: FnOnce() -> Box<dyn DecodingCapability>,
    {
        if self.capability.is_some() {
            debug!("Scan controller already initialized");
            return Ok(false);
        }

        let mut capability = factory();
        capability.start(&self.config, tx)?;
        info!(
            capability = capability.name(),
            element = %self.config.element_id,
            "Decoding capability started"
        );
        self.capability = Some(capability);
        Ok(true)
    }

    /// Whether a capability is attached.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.capability.is_some()
    }

    /// Current state of the attached capability.
    #[must_use]
    pub fn state(&self) -> ScannerState {
        self.capability
            .as_ref()
            .map_or(ScannerState::NotStarted, |c| c.state())
    }

    /// Pause scanning if currently scanning.
    pub fn pause(&mut self) {
        let Some(capability) = self.capability.as_mut() else {
            debug!("Pause requested before the decoder was constructed");
            return;
        };
        if capability.state() != ScannerState::Scanning {
            debug!(state = %capability.state(), "Decoder not scanning, skipping pause");
            return;
        }
        if let Err(e) = capability.pause() {
            warn!(error = %e, "Failed to pause decoder");
        }
    }

    /// Resume scanning if currently paused.
    pub fn resume(&mut self) {
        let Some(capability) = self.capability.as_mut() else {
            debug!("Resume requested without a decoder");
            return;
        };
        if capability.state() != ScannerState::Paused {
            debug!(state = %capability.state(), "Decoder not paused, skipping resume");
            return;
        }
        if let Err(e) = capability.resume() {
            warn!(error = %e, "Failed to resume decoder");
        }
    }

    /// Release the capability. Safe to call at any time, including twice.
    pub async fn teardown(&mut self) {
        let Some(mut capability) = self.capability.take() else {
            return;
        };
        match capability.clear().await {
            Ok(()) => info!(capability = capability.name(), "Decoding capability released"),
            Err(e) => error!(error = %e, "Failed to clear decoder"),
        }
    }
}

/// Busy flag plus last-value check guarding request submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanGate {
    busy: bool,
    last_value: Option<String>,
}

impl ScanGate {
    /// Create an idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `value` if no request is in flight and it differs from the last
    /// accepted value. Accepting marks the gate busy.
    pub fn try_accept(&mut self, value: &str) -> bool {
        if self.busy || self.last_value.as_deref() == Some(value) {
            return false;
        }
        self.busy = true;
        self.last_value = Some(value.to_string());
        true
    }

    /// Mark the in-flight request as finished.
    pub fn finish(&mut self) {
        self.busy = false;
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The last accepted value.
    #[must_use]
    pub fn last_value(&self) -> Option<&str> {
        self.last_value.as_deref()
    }
}
