//! The kiosk event loop.
//!
//! [`Kiosk`] ties the scan controller and the query coordinator together. All
//! kiosk state lives in one task running [`Kiosk::run`]; decode events,
//! request completions, the auto-clear timer and disposal are handled one at
//! a time by a single `select!` loop:
//!
//! ```text
//! IDLE --(decode, gate passes)--> BUSY (decoder paused)
//! BUSY --(response or error)--> DISPLAYING (decoder resumed)
//! DISPLAYING --(clear timer)--> IDLE
//! ```

use std::future::pending;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Notify};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace};

use crate::capability::{DecodedValue, DecodingCapability};
use crate::config::{Config, DisplayTimings};
use crate::error::Result;
use crate::outcome::{DisplayState, Outcome};
use crate::query::{CheckinApi, QueryCoordinator};
use crate::scan::{ScanController, ScanGate};

/// Capacity of the channel between the decoding capability and the kiosk.
const DECODE_CHANNEL_CAPACITY: usize = 32;

/// Marks a kiosk as torn down.
///
/// Cloneable; every clone observes the same disposal. Asynchronous results are
/// checked against it before they are applied.
#[derive(Debug, Clone, Default)]
pub struct DisposalToken {
    disposed: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl DisposalToken {
    /// Create a live token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the kiosk as disposed and wake the event loop.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Wait until the token is disposed.
    pub async fn disposed(&self) {
        let notified = self.notify.notified();
        if self.is_disposed() {
            return;
        }
        notified.await;
    }
}

/// Handle used to unmount a running kiosk from another task.
#[derive(Debug, Clone)]
pub struct KioskHandle {
    token: DisposalToken,
}

impl KioskHandle {
    /// Tear the kiosk down. The decoding capability is released and no
    /// further display updates are published.
    pub fn dispose(&self) {
        debug!("Kiosk disposal requested");
        self.token.dispose();
    }

    /// Whether the kiosk has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.token.is_disposed()
    }
}

/// A mounted check-in kiosk.
#[derive(Debug)]
pub struct Kiosk {
    scanner: ScanController,
    coordinator: QueryCoordinator,
    gate: ScanGate,
    timings: DisplayTimings,
    decoded: mpsc::Receiver<DecodedValue>,
    display: watch::Sender<DisplayState>,
    token: DisposalToken,
}

impl Kiosk {
    /// Mount a kiosk: construct the decoding capability and start scanning.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoding capability fails to start.
    pub fn mount<F>(config: &Config, api: Arc<dyn CheckinApi>, factory: F) -> Result<Self>
    where
        F: FnOnce() -> Box<dyn DecodingCapability>,
    {
        let (tx, decoded) = mpsc::channel(DECODE_CHANNEL_CAPACITY);
        let mut scanner = ScanController::new(config.scanner.clone());
        scanner.initialize(factory, tx)?;

        let (display, _) = watch::channel(DisplayState::default());

        Ok(Self {
            scanner,
            coordinator: QueryCoordinator::new(api, config.request_timeout()),
            gate: ScanGate::new(),
            timings: config.display_timings(),
            decoded,
            display,
            token: DisposalToken::new(),
        })
    }

    /// A handle that can dispose the kiosk while it runs.
    #[must_use]
    pub fn handle(&self) -> KioskHandle {
        KioskHandle {
            token: self.token.clone(),
        }
    }

    /// Subscribe to display state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.subscribe()
    }

    /// Run the event loop until disposed, or until the decoding capability
    /// closes its input and the last outcome has been cleared.
    ///
    /// The capability is always released before this returns.
    pub async fn run(mut self) {
        info!("Kiosk running");

        let mut in_flight: Option<JoinHandle<Outcome>> = None;
        let mut clear_at: Option<Instant> = None;
        let mut input_closed = false;

        loop {
            if input_closed && in_flight.is_none() && clear_at.is_none() {
                info!("Decoder input closed, stopping kiosk");
                break;
            }

            tokio::select! {
                biased;

                () = self.token.disposed() => break,

                joined = join_in_flight(&mut in_flight) => {
                    in_flight = None;
                    if self.token.is_disposed() {
                        break;
                    }
                    let outcome = joined.unwrap_or_else(|e| {
                        error!(error = %e, "Check-in task failed");
                        Outcome::connection_error()
                    });
                    clear_at = Some(Instant::now() + outcome.display_for(&self.timings));
                    self.show_outcome(outcome);
                }

                () = sleep_until_deadline(clear_at) => {
                    clear_at = None;
                    trace!("Clearing outcome");
                    self.display.send_modify(|state| state.outcome = None);
                }

                decoded = self.decoded.recv(), if !input_closed => match decoded {
                    Some(value) => {
                        if let Some(task) = self.on_detected(value) {
                            in_flight = Some(task);
                        }
                    }
                    None => input_closed = true,
                },
            }
        }

        if let Some(task) = in_flight.take() {
            debug!("Abandoning in-flight check-in");
            task.abort();
        }
        self.scanner.teardown().await;
        info!("Kiosk stopped");
    }

    /// Handle one decode event. Returns the spawned request if the gate let
    /// the value through.
    fn on_detected(&mut self, value: DecodedValue) -> Option<JoinHandle<Outcome>> {
        if !self.gate.try_accept(value.as_str()) {
            trace!(value = %value, busy = self.gate.is_busy(), "Decode suppressed");
            return None;
        }

        info!(value = %value, "Code scanned");
        self.display.send_modify(|state| {
            state.loading = true;
            state.last_scanned = Some(value.as_str().to_string());
        });
        self.scanner.pause();

        let coordinator = self.coordinator.clone();
        Some(tokio::spawn(async move { coordinator.submit(&value).await }))
    }

    /// Record an outcome, then release the gate and resume scanning.
    fn show_outcome(&mut self, outcome: Outcome) {
        self.display.send_modify(|state| {
            state.loading = false;
            state.outcome = Some(outcome);
        });
        self.gate.finish();
        self.scanner.resume();
    }
}

async fn join_in_flight(
    in_flight: &mut Option<JoinHandle<Outcome>>,
) -> std::result::Result<Outcome, JoinError> {
    match in_flight {
        Some(task) => task.await,
        None => pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
