//! Check-in outcomes and the display state built from them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DisplayTimings;

/// Message shown when the endpoint could not be reached or understood.
pub const CONNECTION_ERROR_MESSAGE: &str = "Lỗi kết nối tới API.";

/// Text of the loading indicator.
pub const LOADING_TEXT: &str = "Đang xử lý...";

/// Shown once the status region has been cleared.
pub const READY_TEXT: &str = "Sẵn sàng quét mã.";

/// Kind of check-in outcome; also selects its styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// The check-in was accepted.
    Success,
    /// The check-in was accepted with a caveat (e.g. already checked in).
    Warning,
    /// The check-in was rejected or could not be performed.
    Error,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Where an outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeOrigin {
    /// Reported by the check-in endpoint.
    Remote,
    /// Synthesized locally after a transport or parse failure.
    Local,
}

/// The body returned by the check-in endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinResponse {
    /// Outcome kind reported by the endpoint.
    pub status: OutcomeKind,
    /// Human-readable message to display.
    pub message: String,
}

/// The result of one check-in, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Outcome kind.
    pub kind: OutcomeKind,
    /// Message to display.
    pub message: String,
    /// Where the outcome came from.
    pub origin: OutcomeOrigin,
    /// When the outcome was recorded.
    pub received_at: DateTime<Utc>,
}

impl Outcome {
    /// Build an outcome from an endpoint response.
    #[must_use]
    pub fn remote(response: CheckinResponse) -> Self {
        Self {
            kind: response.status,
            message: response.message,
            origin: OutcomeOrigin::Remote,
            received_at: Utc::now(),
        }
    }

    /// Build the local outcome shown when the endpoint is unreachable.
    #[must_use]
    pub fn connection_error() -> Self {
        Self {
            kind: OutcomeKind::Error,
            message: CONNECTION_ERROR_MESSAGE.to_string(),
            origin: OutcomeOrigin::Local,
            received_at: Utc::now(),
        }
    }

    /// How long this outcome stays visible.
    #[must_use]
    pub fn display_for(&self, timings: &DisplayTimings) -> Duration {
        match self.origin {
            OutcomeOrigin::Remote => timings.remote,
            OutcomeOrigin::Local => timings.local_error,
        }
    }

    /// Style class of the status region while this outcome is shown.
    #[must_use]
    pub fn css_class(&self) -> String {
        format!("response-message {}", self.kind)
    }
}

/// Everything the status region renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    /// A request is in flight.
    pub loading: bool,
    /// The outcome currently shown, if any.
    pub outcome: Option<Outcome>,
    /// The last value that triggered a request.
    pub last_scanned: Option<String>,
}

impl DisplayState {
    /// Style class of the status region.
    #[must_use]
    pub fn css_class(&self) -> String {
        self.outcome
            .as_ref()
            .map_or_else(|| "hidden".to_string(), Outcome::css_class)
    }

    /// The message currently shown, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.outcome.as_ref().map(|o| o.message.as_str())
    }

    /// Whether the status region is hidden and nothing is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.loading && self.outcome.is_none()
    }

    /// Lines of text for a terminal rendering of the status region.
    ///
    /// An idle region renders as a single ready line, so a terminal that
    /// cannot erase earlier output still shows the outcome was dismissed.
    #[must_use]
    pub fn render_lines(&self) -> Vec<String> {
        if self.is_idle() {
            return vec![READY_TEXT.to_string()];
        }
        let mut lines = Vec::new();
        if self.loading {
            lines.push(LOADING_TEXT.to_string());
        }
        if let Some(outcome) = &self.outcome {
            lines.push(format!("[{}] {}", outcome.kind, outcome.message));
        }
        lines
    }
}
