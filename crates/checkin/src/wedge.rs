//! Keyboard-wedge decoding capability.
//!
//! Hardware QR readers in keyboard-wedge mode type each decoded code followed
//! by a newline. [`LineScanner`] reads those lines from any async reader
//! (normally stdin) and emits one [`DecodedValue`] per non-empty line while
//! scanning. Lines that arrive while paused are discarded, the same way a
//! paused camera stops decoding frames.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::capability::{CapabilityError, DecodedValue, DecodingCapability, Result, ScannerState};
use crate::config::ScannerConfig;

/// [`ScannerState`] shared with the reader task.
#[derive(Debug, Clone, Default)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn load(&self) -> ScannerState {
        match self.0.load(Ordering::SeqCst) {
            1 => ScannerState::Scanning,
            2 => ScannerState::Paused,
            _ => ScannerState::NotStarted,
        }
    }

    fn store(&self, state: ScannerState) {
        let raw = match state {
            ScannerState::NotStarted => 0,
            ScannerState::Scanning => 1,
            ScannerState::Paused => 2,
        };
        self.0.store(raw, Ordering::SeqCst);
    }
}

/// Reads decoded codes line by line from an async reader.
pub struct LineScanner<R> {
    reader: Option<R>,
    state: SharedState,
    task: Option<JoinHandle<()>>,
}

impl<R> std::fmt::Debug for LineScanner<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineScanner")
            .field("state", &self.state.load())
            .field("has_reader", &self.reader.is_some())
            .field("running", &self.task.is_some())
            .finish()
    }
}

impl<R> LineScanner<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Create a scanner over the given reader. Nothing is read until started.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            state: SharedState::default(),
            task: None,
        }
    }
}

impl LineScanner<tokio::io::Stdin> {
    /// Create a scanner reading from standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

#[async_trait::async_trait]
impl<R> DecodingCapability for LineScanner<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn name(&self) -> &'static str {
        "line-scanner"
    }

    fn state(&self) -> ScannerState {
        self.state.load()
    }

    fn start(&mut self, config: &ScannerConfig, tx: mpsc::Sender<DecodedValue>) -> Result<()> {
        if self.task.is_some() {
            return Err(CapabilityError::AlreadyStarted);
        }
        let reader = self
            .reader
            .take()
            .ok_or_else(|| CapabilityError::StartFailed("input already consumed".to_string()))?;

        info!(
            element = %config.element_id,
            fps = config.fps,
            qrbox = %format!("{}x{}", config.qrbox_width, config.qrbox_height),
            "Starting line scanner"
        );

        self.state.store(ScannerState::Scanning);
        self.task = Some(tokio::spawn(read_lines(
            BufReader::new(reader),
            self.state.clone(),
            config.frame_interval(),
            tx,
        )));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        match self.state.load() {
            ScannerState::Scanning => {
                self.state.store(ScannerState::Paused);
                debug!("Line scanner paused");
                Ok(())
            }
            state => Err(CapabilityError::InvalidState {
                operation: "pause",
                state,
            }),
        }
    }

    fn resume(&mut self) -> Result<()> {
        match self.state.load() {
            ScannerState::Paused => {
                self.state.store(ScannerState::Scanning);
                debug!("Line scanner resumed");
                Ok(())
            }
            state => Err(CapabilityError::InvalidState {
                operation: "resume",
                state,
            }),
        }
    }

    async fn clear(&mut self) -> Result<()> {
        self.state.store(ScannerState::NotStarted);
        if let Some(task) = self.task.take() {
            task.abort();
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => return Err(CapabilityError::ClearFailed(e.to_string())),
            }
        }
        debug!("Line scanner cleared");
        Ok(())
    }
}

async fn read_lines<R>(
    reader: BufReader<R>,
    state: SharedState,
    frame_interval: Duration,
    tx: mpsc::Sender<DecodedValue>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = reader.lines();
    let mut frames = interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Scanner input closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Error reading scanner input");
                break;
            }
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        // Checked on arrival and again once the frame is due, so nothing
        // typed during a pause survives the wait for the next frame.
        if state.load() != ScannerState::Scanning {
            trace!(value = %text, "Scanner paused, discarding input");
            continue;
        }

        frames.tick().await;

        if state.load() != ScannerState::Scanning {
            trace!(value = %text, "Scanner paused before frame, discarding input");
            continue;
        }

        if tx.send(DecodedValue::new(text)).await.is_err() {
            debug!("Decode channel closed, stopping line scanner");
            break;
        }
    }
}
