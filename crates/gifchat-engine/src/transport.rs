//! Real-time transport for chat events.
//!
//! A [`Transport`] is one party's connection to a relay that fans chat events
//! out to every participant. It is handed to each pane at construction; the
//! pane decides when to publish, and the session drains the connection's
//! [`Subscription`] for inbound events.
//!
//! Events travel as JSON frames shaped `{"event": name, "data": {...}}`:
//!
//! | outbound  | relayed as    | audience           |
//! |-----------|---------------|--------------------|
//! | `join`    | `user_joined` | everyone but sender|
//! | `message` | `new_message` | everyone           |
//! | `typing`  | `user_typing` | everyone but sender|

use crate::message::{Message, MessageKind, PartyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// Capacity of the relay's broadcast buffer.
const RELAY_CAPACITY: usize = 256;

/// Chat message as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gif_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatPayload {
    /// Wrap a message sent by `username`.
    pub fn from_message(username: &str, message: &Message) -> Self {
        let (text, gif_url) = match message.kind() {
            MessageKind::Text => (Some(message.content().to_string()), None),
            MessageKind::Gif => (None, Some(message.content().to_string())),
        };
        Self {
            username: username.to_string(),
            text,
            gif_url,
            timestamp: message.timestamp(),
        }
    }

    /// Rebuild the message, attributing it to `sender`. A GIF URL wins over text.
    pub fn into_message(self, sender: PartyId) -> Option<Message> {
        let (content, kind) = match (self.gif_url, self.text) {
            (Some(url), _) => (url, MessageKind::Gif),
            (None, Some(text)) => (text, MessageKind::Text),
            (None, None) => return None,
        };
        Some(Message::at(sender, content, kind, self.timestamp))
    }
}

/// A `{username}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub username: String,
}

/// Every frame the relay understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WireEvent {
    Join(UserRef),
    Message(ChatPayload),
    Typing(UserRef),
    UserJoined(UserRef),
    NewMessage(ChatPayload),
    UserTyping(UserRef),
}

impl WireEvent {
    pub fn encode(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(TransportError::Encode)
    }

    pub fn decode(frame: &str) -> Result<Self, TransportError> {
        serde_json::from_str(frame).map_err(TransportError::Decode)
    }

    /// The relayed form of an outbound event, and whether the sender is excluded.
    fn relayed(self) -> Option<(Self, bool)> {
        match self {
            Self::Join(user) => Some((Self::UserJoined(user), true)),
            Self::Message(payload) => Some((Self::NewMessage(payload), false)),
            Self::Typing(user) => Some((Self::UserTyping(user), true)),
            Self::UserJoined(_) | Self::NewMessage(_) | Self::UserTyping(_) => None,
        }
    }
}

/// Inbound events a pane reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A chat message, including echoes of our own sends.
    Message(ChatPayload),
    /// Someone else is typing.
    PeerTyping { username: String },
    /// Someone else connected.
    PeerJoined { username: String },
}

impl TransportEvent {
    fn from_wire(event: WireEvent) -> Option<Self> {
        match event {
            WireEvent::NewMessage(payload) => Some(Self::Message(payload)),
            WireEvent::UserTyping(user) => Some(Self::PeerTyping {
                username: user.username,
            }),
            WireEvent::UserJoined(user) => Some(Self::PeerJoined {
                username: user.username,
            }),
            WireEvent::Join(_) | WireEvent::Message(_) | WireEvent::Typing(_) => None,
        }
    }
}

/// Identity of one connection on the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One encoded event on the relay.
#[derive(Debug, Clone)]
struct Frame {
    /// Connection that must not see this frame.
    skip: Option<ConnectionId>,
    payload: String,
}

/// Inbound side of a connection.
#[derive(Debug)]
pub struct Subscription {
    id: ConnectionId,
    rx: broadcast::Receiver<Frame>,
    dropped: u64,
}

impl Subscription {
    /// Next buffered event without waiting, or `None` when drained.
    pub fn try_next(&mut self) -> Option<TransportEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(frame) => {
                    if let Some(event) = self.accept(frame) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    /// Wait for the next event. Returns `None` once the relay is gone.
    pub async fn next(&mut self) -> Option<TransportEvent> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => {
                    if let Some(event) = self.accept(frame) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Events lost because this subscriber fell behind the relay buffer.
    ///
    /// Non-zero means this pane's history no longer mirrors the peer's.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn lagged(&mut self, skipped: u64) {
        self.dropped += skipped;
        warn!(
            connection = %self.id,
            skipped,
            total = self.dropped,
            "Subscription lagged; history no longer mirrors the peer"
        );
    }

    fn accept(&self, frame: Frame) -> Option<TransportEvent> {
        if frame.skip == Some(self.id) {
            return None;
        }
        match WireEvent::decode(&frame.payload) {
            Ok(event) => TransportEvent::from_wire(event),
            Err(e) => {
                warn!(connection = %self.id, error = %e, "Dropping undecodable frame");
                None
            }
        }
    }
}

/// A party's connection to the chat relay.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Connect as `username` and announce the join.
    fn open(&self, username: &str) -> Result<(), TransportError>;

    /// Disconnect. Further sends fail with [`TransportError::NotOpen`].
    fn close(&self);

    fn is_open(&self) -> bool;

    /// Publish a chat message.
    fn send(&self, message: &Message) -> Result<(), TransportError>;

    /// Tell the other participants we are typing.
    fn notify_typing(&self) -> Result<(), TransportError>;

    /// Receive inbound events from this point on.
    fn subscribe(&self) -> Subscription;
}

/// In-process relay behaving like the chat server: it rebroadcasts what
/// connections publish to every other connection.
#[derive(Debug, Clone)]
pub struct LocalRelay {
    tx: broadcast::Sender<Frame>,
}

impl Default for LocalRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::with_capacity(RELAY_CAPACITY)
    }

    /// Relay that buffers at most `capacity` undelivered frames per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Create a fresh, unopened connection.
    pub fn connect(&self) -> LocalTransport {
        LocalTransport {
            id: ConnectionId::new(),
            relay: self.clone(),
            username: Mutex::new(None),
            open: AtomicBool::new(false),
        }
    }

    fn publish(&self, origin: ConnectionId, event: WireEvent) -> Result<(), TransportError> {
        let Some((relayed, skip_origin)) = event.relayed() else {
            return Ok(());
        };
        let payload = relayed.encode()?;
        debug!(connection = %origin, frame = %payload, "Relaying frame");
        let frame = Frame {
            skip: skip_origin.then_some(origin),
            payload,
        };
        // No receivers just means nobody is listening yet.
        let _ = self.tx.send(frame);
        Ok(())
    }
}

/// One connection to a [`LocalRelay`].
#[derive(Debug)]
pub struct LocalTransport {
    id: ConnectionId,
    relay: LocalRelay,
    username: Mutex<Option<String>>,
    open: AtomicBool,
}

impl LocalTransport {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    fn username(&self) -> Result<String, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.username
            .lock()
            .map_err(|_| TransportError::Closed)?
            .clone()
            .ok_or(TransportError::NotOpen)
    }
}

impl Transport for LocalTransport {
    fn open(&self, username: &str) -> Result<(), TransportError> {
        *self.username.lock().map_err(|_| TransportError::Closed)? = Some(username.to_string());
        self.open.store(true, Ordering::SeqCst);
        self.relay.publish(
            self.id,
            WireEvent::Join(UserRef {
                username: username.to_string(),
            }),
        )
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, message: &Message) -> Result<(), TransportError> {
        let username = self.username()?;
        self.relay.publish(
            self.id,
            WireEvent::Message(ChatPayload::from_message(&username, message)),
        )
    }

    fn notify_typing(&self) -> Result<(), TransportError> {
        let username = self.username()?;
        self.relay
            .publish(self.id, WireEvent::Typing(UserRef { username }))
    }

    fn subscribe(&self) -> Subscription {
        Subscription {
            id: self.id,
            rx: self.relay.tx.subscribe(),
            dropped: 0,
        }
    }
}

/// Shared handle passed to panes.
pub type SharedTransport = Arc<dyn Transport>;

/// Errors from transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The relay or connection state is gone.
    #[error("Transport closed")]
    Closed,

    /// Operation requires an open connection.
    #[error("Transport is not open")]
    NotOpen,

    /// Frame could not be serialized.
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// Frame could not be parsed.
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opened(relay: &LocalRelay, name: &str) -> LocalTransport {
        let conn = relay.connect();
        conn.open(name).unwrap();
        conn
    }

    #[test]
    fn test_wire_event_shape() {
        let event = WireEvent::Typing(UserRef {
            username: "User 1".into(),
        });
        let value: serde_json::Value = serde_json::from_str(&event.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"event": "typing", "data": {"username": "User 1"}}));
    }

    #[test]
    fn test_chat_payload_uses_gif_url_key() {
        let message = Message::gif(PartyId::First, "https://x/1.gif");
        let payload = ChatPayload::from_message("User 1", &message);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["gifUrl"], "https://x/1.gif");
        assert!(value.get("text").is_none());

        let back = payload.into_message(PartyId::First).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_payload_without_content_is_rejected() {
        let payload = ChatPayload {
            username: "User 1".into(),
            text: None,
            gif_url: None,
            timestamp: Utc::now(),
        };
        assert!(payload.into_message(PartyId::First).is_none());
    }

    #[test]
    fn test_message_is_echoed_to_everyone_in_order() {
        let relay = LocalRelay::new();
        let alice = relay.connect();
        let bob = relay.connect();
        let mut alice_rx = alice.subscribe();
        let mut bob_rx = bob.subscribe();
        alice.open("User 1").unwrap();
        bob.open("User 2").unwrap();

        alice.send(&Message::text(PartyId::First, "one")).unwrap();
        bob.send(&Message::text(PartyId::Second, "two")).unwrap();

        let texts = |rx: &mut Subscription| {
            std::iter::from_fn(|| rx.try_next())
                .filter_map(|event| match event {
                    TransportEvent::Message(payload) => payload.text,
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(texts(&mut alice_rx), ["one", "two"]);
        assert_eq!(texts(&mut bob_rx), ["one", "two"]);
    }

    #[test]
    fn test_typing_and_join_skip_sender() {
        let relay = LocalRelay::new();
        let alice = relay.connect();
        let bob = relay.connect();
        let mut alice_rx = alice.subscribe();
        let mut bob_rx = bob.subscribe();

        alice.open("User 1").unwrap();
        alice.notify_typing().unwrap();

        assert_eq!(alice_rx.try_next(), None);
        assert_eq!(
            bob_rx.try_next(),
            Some(TransportEvent::PeerJoined {
                username: "User 1".into()
            })
        );
        assert_eq!(
            bob_rx.try_next(),
            Some(TransportEvent::PeerTyping {
                username: "User 1".into()
            })
        );
        assert_eq!(bob_rx.try_next(), None);
    }

    #[test]
    fn test_overflow_is_counted() {
        let relay = LocalRelay::with_capacity(2);
        let bob = relay.connect();
        let mut inbox = bob.subscribe();
        let alice = opened(&relay, "User 1");
        for n in 0..3 {
            alice
                .send(&Message::text(PartyId::First, format!("m{n}")))
                .unwrap();
        }

        let mut received = Vec::new();
        while let Some(event) = inbox.try_next() {
            received.push(event);
        }
        assert_eq!(inbox.dropped(), 2);
        assert_eq!(received.len(), 2);
        assert!(received
            .iter()
            .all(|event| matches!(event, TransportEvent::Message(_))));
    }

    #[test]
    fn test_closed_connection_cannot_send() {
        let relay = LocalRelay::new();
        let conn = opened(&relay, "User 1");
        assert!(conn.is_open());

        conn.close();
        assert!(matches!(
            conn.send(&Message::text(PartyId::First, "hi")),
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(conn.notify_typing(), Err(TransportError::NotOpen)));
    }

    #[test]
    fn test_unopened_connection_cannot_send() {
        let relay = LocalRelay::new();
        let conn = relay.connect();
        assert!(matches!(
            conn.send(&Message::text(PartyId::First, "hi")),
            Err(TransportError::NotOpen)
        ));
    }

    #[tokio::test]
    async fn test_async_next_receives_event() {
        let relay = LocalRelay::new();
        let alice = opened(&relay, "User 1");
        let mut rx = alice.subscribe();
        alice.send(&Message::text(PartyId::First, "ping")).unwrap();

        match rx.next().await {
            Some(TransportEvent::Message(payload)) => assert_eq!(payload.text.as_deref(), Some("ping")),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
