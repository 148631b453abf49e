//! Typing indicators.
//!
//! The peer indicator is a timeout heuristic: each notification keeps it lit
//! for a fixed window and a scheduled reset clears it. There is no explicit
//! "stopped typing" event.

use std::time::Duration;
use tokio::time::Instant;

/// "Peer is typing" flag with a fixed visibility window.
#[derive(Debug, Clone)]
pub struct PeerTyping {
    window: Duration,
    until: Option<Instant>,
}

impl PeerTyping {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: None,
        }
    }

    /// Record a typing notification received at `now`.
    pub fn notify(&mut self, now: Instant) {
        self.until = Some(now + self.window);
    }

    /// Whether the indicator is lit at `now`.
    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// When the scheduled reset fires.
    pub fn deadline(&self) -> Option<Instant> {
        self.until
    }

    /// Apply the scheduled reset if due. Returns `true` when the flag was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if until <= now => {
                self.until = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.until = None;
    }
}

/// Rate limit for outbound typing notifications.
#[derive(Debug, Clone)]
pub struct TypingThrottle {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl TypingThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// Whether a notification should go out at `now`; records it if so.
    pub fn should_notify(&mut self, now: Instant) -> bool {
        let due = self
            .last_sent
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if due {
            self.last_sent = Some(now);
        }
        due
    }

    /// Forget the last notification so the next edit notifies immediately.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}
