//! Message types shared by both conversation panes.
//!
//! A [`Message`] is the immutable record of one chat event. Both panes hold
//! their own copy of every message; see [`crate::store`] for mirroring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two conversation participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyId {
    /// The left-hand pane.
    First,
    /// The right-hand pane.
    Second,
}

impl PartyId {
    /// Both parties, in pane order.
    pub const ALL: [PartyId; 2] = [PartyId::First, PartyId::Second];

    /// The other participant.
    pub const fn peer(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Stable slot index (0 or 1) for per-pane arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::Second => f.write_str("second"),
        }
    }
}

/// Kind of content a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text typed by the sender.
    Text,
    /// A GIF, with the GIF URL as content.
    Gif,
}

/// A single chat event.
///
/// Fields are private so a message cannot change after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    sender: PartyId,
    content: String,
    kind: MessageKind,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(sender: PartyId, content: impl Into<String>, kind: MessageKind) -> Self {
        Self::at(sender, content, kind, Utc::now())
    }

    /// Create a message with an explicit timestamp (used for transport-delivered messages).
    pub fn at(
        sender: PartyId,
        content: impl Into<String>,
        kind: MessageKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sender,
            content: content.into(),
            kind,
            timestamp,
        }
    }

    /// Create a text message.
    pub fn text(sender: PartyId, content: impl Into<String>) -> Self {
        Self::new(sender, content, MessageKind::Text)
    }

    /// Create a GIF message whose content is the GIF URL.
    pub fn gif(sender: PartyId, url: impl Into<String>) -> Self {
        Self::new(sender, url, MessageKind::Gif)
    }

    pub fn sender(&self) -> PartyId {
        self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether `party` sent this message.
    pub fn is_from(&self, party: PartyId) -> bool {
        self.sender == party
    }
}
