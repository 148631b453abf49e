//! Conversation store for the two mirrored panes.
//!
//! Every send is appended to the sender's history and the peer's history in
//! one step, so both panes always agree on relative message order.

use crate::message::{Message, MessageKind, PartyId};
use tracing::info;

/// Content recorded as the peer's last received message when a GIF arrives
/// and [`ConversationStore::gif_receipt_updates_context`] is enabled.
pub const GIF_RECEIPT_PLACEHOLDER: &str = "[GIF]";

/// History and received-context for one pane.
#[derive(Debug, Clone, Default)]
struct PaneHistory {
    messages: Vec<Message>,
    last_received: Option<String>,
}

/// Ordered message sequences for both panes.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    panes: [PaneHistory; 2],
    gif_receipt_updates_context: bool,
}

impl ConversationStore {
    /// Create an empty store where GIF receipts leave the reply context untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with an explicit GIF receipt policy.
    pub fn with_gif_receipt_policy(gif_receipt_updates_context: bool) -> Self {
        Self {
            gif_receipt_updates_context,
            ..Self::default()
        }
    }

    /// Whether a received GIF replaces `last_received` with [`GIF_RECEIPT_PLACEHOLDER`].
    pub fn gif_receipt_updates_context(&self) -> bool {
        self.gif_receipt_updates_context
    }

    /// Send `content` from `sender`, mirroring it into the peer's pane.
    ///
    /// Whitespace-only content is ignored and returns `None`.
    pub fn send(&mut self, sender: PartyId, content: &str, kind: MessageKind) -> Option<Message> {
        if content.trim().is_empty() {
            return None;
        }
        let message = Message::new(sender, content, kind);
        self.deliver(message.clone());
        Some(message)
    }

    /// Append an already-built message to both panes.
    ///
    /// Used directly by transport delivery; [`Self::send`] goes through here too.
    /// Returns `false` (and appends nothing) for whitespace-only content.
    pub fn deliver(&mut self, message: Message) -> bool {
        if message.content().trim().is_empty() {
            return false;
        }

        info!(
            sender = %message.sender(),
            kind = ?message.kind(),
            "Message delivered to both panes"
        );

        let sender = message.sender();
        self.append(sender.peer(), message.clone());
        self.append(sender, message);
        true
    }

    /// Append a message to a single pane, as a relay delivers it.
    ///
    /// Each pane receives relayed messages independently; the relay's single
    /// broadcast order keeps the panes in the same relative order.
    pub fn receive(&mut self, pane: PartyId, message: Message) -> bool {
        if message.content().trim().is_empty() {
            return false;
        }
        self.append(pane, message);
        true
    }

    fn append(&mut self, pane: PartyId, message: Message) {
        let history = &mut self.panes[pane.index()];
        if !message.is_from(pane) {
            match message.kind() {
                MessageKind::Text => {
                    history.last_received = Some(message.content().to_string());
                }
                MessageKind::Gif if self.gif_receipt_updates_context => {
                    history.last_received = Some(GIF_RECEIPT_PLACEHOLDER.to_string());
                }
                MessageKind::Gif => {}
            }
        }
        history.messages.push(message);
    }

    /// Messages visible in `pane`, oldest first.
    pub fn history(&self, pane: PartyId) -> &[Message] {
        &self.panes[pane.index()].messages
    }

    /// Content of the most recent message `pane` received from its peer.
    pub fn last_received(&self, pane: PartyId) -> Option<&str> {
        self.panes[pane.index()].last_received.as_deref()
    }

    /// Length of the longer of the two histories.
    pub fn len(&self) -> usize {
        self.panes
            .iter()
            .map(|pane| pane.messages.len())
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
