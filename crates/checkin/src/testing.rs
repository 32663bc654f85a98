//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::capability::{CapabilityError, DecodedValue, DecodingCapability, ScannerState};
use crate::config::ScannerConfig;
use crate::error::{Error, Result};
use crate::outcome::{CheckinResponse, OutcomeKind};
use crate::query::CheckinApi;

/// Ordered record of lifecycle calls made on a [`RecordingCapability`].
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<&'static str>>>);

impl EventLog {
    fn push(&self, event: &'static str) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

/// Lets a test push values as if the capability had decoded them.
#[derive(Debug, Clone, Default)]
pub struct Feed(Arc<Mutex<Option<mpsc::Sender<DecodedValue>>>>);

impl Feed {
    /// Deliver a decoded value. Returns false once the capability is cleared.
    pub async fn detect(&self, text: &str) -> bool {
        let tx = self.0.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(DecodedValue::new(text)).await.is_ok(),
            None => false,
        }
    }

    /// Drop the sender, as a capability does when its input ends.
    pub fn close(&self) {
        self.0.lock().unwrap().take();
    }
}

/// A capability that records every lifecycle call.
#[derive(Debug)]
pub struct RecordingCapability {
    state: ScannerState,
    log: EventLog,
    feed: Feed,
    fail_start: bool,
    fail_transitions: bool,
}

impl RecordingCapability {
    fn build(fail_start: bool, fail_transitions: bool) -> (Self, EventLog, Feed) {
        let log = EventLog::default();
        let feed = Feed::default();
        let capability = Self {
            state: ScannerState::NotStarted,
            log: log.clone(),
            feed: feed.clone(),
            fail_start,
            fail_transitions,
        };
        (capability, log, feed)
    }

    pub fn new() -> (Self, EventLog) {
        let (capability, log, _) = Self::build(false, false);
        (capability, log)
    }

    pub fn with_feed() -> (Self, EventLog, Feed) {
        Self::build(false, false)
    }

    pub fn failing_start() -> (Self, EventLog) {
        let (capability, log, _) = Self::build(true, false);
        (capability, log)
    }

    pub fn failing_transitions() -> (Self, EventLog) {
        let (capability, log, _) = Self::build(false, true);
        (capability, log)
    }
}

#[async_trait::async_trait]
impl DecodingCapability for RecordingCapability {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn state(&self) -> ScannerState {
        self.state
    }

    fn start(
        &mut self,
        _config: &ScannerConfig,
        tx: mpsc::Sender<DecodedValue>,
    ) -> crate::capability::Result<()> {
        self.log.push("start");
        if self.fail_start {
            return Err(CapabilityError::StartFailed("no camera".to_string()));
        }
        *self.feed.0.lock().unwrap() = Some(tx);
        self.state = ScannerState::Scanning;
        Ok(())
    }

    fn pause(&mut self) -> crate::capability::Result<()> {
        self.log.push("pause");
        if self.fail_transitions {
            return Err(CapabilityError::InvalidState {
                operation: "pause",
                state: self.state,
            });
        }
        self.state = ScannerState::Paused;
        Ok(())
    }

    fn resume(&mut self) -> crate::capability::Result<()> {
        self.log.push("resume");
        if self.fail_transitions {
            return Err(CapabilityError::InvalidState {
                operation: "resume",
                state: self.state,
            });
        }
        self.state = ScannerState::Scanning;
        Ok(())
    }

    async fn clear(&mut self) -> crate::capability::Result<()> {
        self.log.push("clear");
        self.feed.close();
        self.state = ScannerState::NotStarted;
        if self.fail_transitions {
            return Err(CapabilityError::ClearFailed("camera busy".to_string()));
        }
        Ok(())
    }
}

/// What a [`ScriptedApi`] does for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond immediately.
    Respond(CheckinResponse),
    /// Respond after a delay.
    Delayed(Duration, CheckinResponse),
    /// Fail as if the connection was refused.
    Fail,
    /// Never settle.
    Hang,
}

impl Reply {
    pub fn ok(kind: OutcomeKind, message: &str) -> Self {
        Self::Respond(CheckinResponse {
            status: kind,
            message: message.to_string(),
        })
    }
}

/// A check-in endpoint that plays back scripted replies and records calls.
///
/// Once the script runs out every call fails.
#[derive(Debug, Default)]
pub struct ScriptedApi {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::default(),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CheckinApi for ScriptedApi {
    async fn check_in(&self, id: &str) -> Result<CheckinResponse> {
        self.calls.lock().unwrap().push(id.to_string());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Fail);
        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Reply::Fail => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Reply::Hang => std::future::pending().await,
        }
    }
}
