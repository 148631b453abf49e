//! Quiet-period debouncing for search-as-you-type.
//!
//! The debouncer holds at most one pending search. Every edit replaces it and
//! restarts the timer; the owner polls with the current time and gets the text
//! back once the quiet period has passed without further edits.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    text: String,
    deadline: Instant,
}

/// Single-slot debouncer driven by explicit timestamps.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Record an edit at `now`, replacing any pending text. Returns the new deadline.
    pub fn schedule(&mut self, text: impl Into<String>, now: Instant) -> Instant {
        let deadline = now + self.quiet;
        self.pending = Some(Pending {
            text: text.into(),
            deadline,
        });
        deadline
    }

    /// Drop the pending edit, if any.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Deadline of the pending edit.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending text if its quiet period has elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => self.pending.take().map(|p| p.text),
            _ => None,
        }
    }
}
