//! Poll health tracking.
//!
//! The availability signal the host exposes while the device is unreachable.
//! Cached status stays served regardless of what is recorded here.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome history of the poll loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollHealth {
    /// Whether the most recent poll succeeded.
    pub available: bool,
    /// Total number of polls attempted.
    pub polls: u64,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Time of the last successful poll.
    pub last_success: Option<DateTime<Utc>>,
    /// Time of the last failed poll.
    pub last_failure: Option<DateTime<Utc>>,
    /// Message of the last failure.
    pub last_error: Option<String>,
}

impl PollHealth {
    pub(crate) fn record_success(&mut self) {
        self.available = true;
        self.polls += 1;
        self.consecutive_failures = 0;
        self.last_success = Some(Utc::now());
    }

    pub(crate) fn record_failure(&mut self, error: &crate::Error) {
        self.available = false;
        self.polls += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(Utc::now());
        self.last_error = Some(error.to_string());
    }
}
