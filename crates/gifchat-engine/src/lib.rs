//! gifchat-engine: Headless engine for the two-pane GIF chat
//!
//! This crate holds everything except rendering:
//! - The mirrored conversation store and its message model
//! - Context selection for reply and search suggestion queries
//! - Per-pane controllers (draft, suggestion panel, typing indicators)
//! - The suggestion HTTP client, debouncing and stale-result tracking
//! - An optional relay transport for delivering messages between parties

pub mod config;
pub mod context;
pub mod dispatch;
pub mod message;
pub mod pane;
pub mod session;
pub mod store;
pub mod suggest;
pub mod transport;
pub mod typing;

// Re-export commonly used types
pub use config::{BackendConfig, Config, ConfigError, SuggestionPolicy, TypingConfig};
pub use context::PaneContext;
pub use dispatch::FetchDispatcher;
pub use message::{Message, MessageKind, PartyId};
pub use pane::{Outgoing, PaneController, PanelState, TypingNotice};
pub use session::{ChatSession, FetchCompletion, FetchRequest};
pub use store::{ConversationStore, GIF_RECEIPT_PLACEHOLDER};
pub use suggest::{
    DebugInfo, FailureKind, FetchTicket, GifCandidate, Resolution, SuggestionClient,
    SuggestionError, SuggestionMode, SuggestionQuery, SuggestionResult,
};
pub use transport::{
    LocalRelay, LocalTransport, SharedTransport, Subscription, Transport, TransportError,
    TransportEvent,
};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
