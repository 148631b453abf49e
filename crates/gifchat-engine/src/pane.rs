//! Per-pane controller: draft, suggestion panel and typing state.
//!
//! The controller turns user intents into state changes. Methods that need a
//! fetch return the [`SuggestionQuery`] to issue; the session tags it with a
//! ticket and later feeds the result back through [`PaneController::apply_result`].
//! Nothing here blocks or performs I/O except publishing through an injected
//! transport.

use crate::config::{Config, SuggestionPolicy};
use crate::context::{self, PaneContext};
use crate::message::{Message, MessageKind, PartyId};
use crate::store::ConversationStore;
use crate::suggest::{
    DebugInfo, Debouncer, GifCandidate, SuggestionMode, SuggestionQuery, SuggestionResult,
};
use crate::transport::SharedTransport;
use crate::typing::{PeerTyping, TypingThrottle};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Visibility of the suggestion panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Closed,
    Open { mode: SuggestionMode, loading: bool },
}

impl PanelState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn mode(self) -> Option<SuggestionMode> {
        match self {
            Self::Open { mode, .. } => Some(mode),
            Self::Closed => None,
        }
    }

    pub fn is_loading(self) -> bool {
        matches!(self, Self::Open { loading: true, .. })
    }
}

/// A message the pane wants sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub kind: MessageKind,
    pub content: String,
}

/// Where a typing notification should go after a draft edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingNotice {
    /// Throttled or nothing typed.
    None,
    /// Already published through the transport.
    Published,
    /// No transport; the caller should light the peer pane directly.
    Local,
}

/// Orchestrates one participant's pane.
#[derive(Debug)]
pub struct PaneController {
    party: PartyId,
    username: String,
    policy: SuggestionPolicy,
    draft: String,
    search_text: String,
    panel: PanelState,
    candidates: Vec<GifCandidate>,
    debug_info: Option<DebugInfo>,
    last_failure: Option<String>,
    debouncer: Debouncer,
    peer_typing: PeerTyping,
    throttle: TypingThrottle,
    transport: Option<SharedTransport>,
}

impl PaneController {
    /// Create a controller for `party`. With a transport, sends and typing
    /// notifications are published through it instead of the local store.
    pub fn new(party: PartyId, config: &Config, transport: Option<SharedTransport>) -> Self {
        Self {
            party,
            username: config.party_name(party).to_string(),
            policy: config.policy.clone(),
            draft: String::new(),
            search_text: String::new(),
            panel: PanelState::Closed,
            candidates: Vec::new(),
            debug_info: None,
            last_failure: None,
            debouncer: Debouncer::new(config.policy.debounce()),
            peer_typing: PeerTyping::new(config.typing.peer_window()),
            throttle: TypingThrottle::new(config.typing.notify_interval()),
            transport,
        }
    }

    pub fn party(&self) -> PartyId {
        self.party
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn policy(&self) -> &SuggestionPolicy {
        &self.policy
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn panel(&self) -> PanelState {
        self.panel
    }

    pub fn transport(&self) -> Option<&SharedTransport> {
        self.transport.as_ref()
    }

    /// True while the draft field holds text.
    pub fn is_typing(&self) -> bool {
        !self.draft.is_empty()
    }

    pub fn is_peer_typing(&self, now: Instant) -> bool {
        self.peer_typing.is_active(now)
    }

    /// Candidates for display, capped at the policy's maximum.
    pub fn visible_candidates(&self) -> &[GifCandidate] {
        let shown = self.candidates.len().min(self.policy.max_suggestions);
        &self.candidates[..shown]
    }

    /// Backend diagnostics, shown only while the panel is in reply mode.
    pub fn debug_info(&self) -> Option<&DebugInfo> {
        match self.panel.mode() {
            Some(SuggestionMode::Reply) => self.debug_info.as_ref(),
            _ => None,
        }
    }

    /// Failure text from the last applied fetch, if it failed.
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// Earliest timer this pane is waiting on.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debouncer.deadline(), self.peer_typing.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn context<'a>(&'a self, last_received: Option<&'a str>) -> PaneContext<'a> {
        PaneContext {
            draft: &self.draft,
            last_received,
            search_text: &self.search_text,
        }
    }

    fn clear_results(&mut self) {
        self.candidates.clear();
        self.debug_info = None;
        self.last_failure = None;
    }

    fn set_loading(&mut self, loading: bool) {
        if let PanelState::Open { mode, .. } = self.panel {
            self.panel = PanelState::Open { mode, loading };
        }
    }

    /// Open the panel, deriving mode and query from the pane's context.
    ///
    /// Returns the query to fetch, or `None` when the panel was already open
    /// or there is nothing to ask for (the panel then opens empty).
    pub fn open_panel(&mut self, last_received: Option<&str>) -> Option<SuggestionQuery> {
        if self.panel.is_open() {
            return None;
        }
        let query = context::select_on_open(&self.context(last_received));
        let mode = query.as_ref().map_or(SuggestionMode::Reply, |q| q.mode);
        if mode == SuggestionMode::Search {
            self.search_text = self.draft.trim().to_string();
        }

        self.clear_results();
        self.panel = PanelState::Open {
            mode,
            loading: query.is_some(),
        };
        debug!(pane = %self.party, ?mode, has_query = query.is_some(), "Suggestion panel opened");
        query
    }

    /// Close the panel. Returns `false` if it was already closed.
    pub fn close_panel(&mut self) -> bool {
        if !self.panel.is_open() {
            return false;
        }
        self.panel = PanelState::Closed;
        self.debouncer.cancel();
        self.clear_results();
        true
    }

    /// Switch the open panel to `mode` and re-derive the query.
    pub fn set_mode(
        &mut self,
        mode: SuggestionMode,
        last_received: Option<&str>,
    ) -> Option<SuggestionQuery> {
        if !self.panel.is_open() {
            return None;
        }
        self.debouncer.cancel();
        self.clear_results();
        let query = context::select_for_mode(&self.context(last_received), mode);
        self.panel = PanelState::Open {
            mode,
            loading: query.is_some(),
        };
        query
    }

    /// Replace the draft text.
    ///
    /// While the panel is searching, the draft drives the search box and the
    /// edit schedules a debounced search.
    pub fn edit_draft(&mut self, text: impl Into<String>, now: Instant) -> TypingNotice {
        self.draft = text.into();
        if self.draft.trim().is_empty() {
            if self.panel.mode() == Some(SuggestionMode::Search) {
                self.search_text.clear();
            }
            if self.debouncer.cancel() {
                self.set_loading(false);
            }
            return TypingNotice::None;
        }

        let query = self.draft.trim().to_string();
        if self.panel.mode() == Some(SuggestionMode::Search) {
            self.search_text.clone_from(&query);
        }
        self.schedule_search(query, now);
        self.notify_typing(now)
    }

    /// Replace the search box text, scheduling a debounced search when live.
    pub fn edit_search(&mut self, text: impl Into<String>, now: Instant) {
        self.search_text = text.into();
        let query = self.search_text.trim().to_string();
        if query.is_empty() {
            if self.debouncer.cancel() {
                self.set_loading(false);
            }
            return;
        }
        self.schedule_search(query, now);
    }

    fn schedule_search(&mut self, text: String, now: Instant) {
        if !self.policy.live_search_on_type
            || self.panel.mode() != Some(SuggestionMode::Search)
        {
            return;
        }
        let deadline = self.debouncer.schedule(text, now);
        self.set_loading(true);
        debug!(pane = %self.party, ?deadline, "Search scheduled");
    }

    /// Search for the search box text right away, skipping the quiet period.
    pub fn submit_search(&mut self) -> Option<SuggestionQuery> {
        if !self.panel.is_open() {
            return None;
        }
        self.debouncer.cancel();
        let text = self.search_text.trim();
        if text.is_empty() {
            return None;
        }
        let query = SuggestionQuery::search(text);
        self.debug_info = None;
        self.panel = PanelState::Open {
            mode: SuggestionMode::Search,
            loading: true,
        };
        Some(query)
    }

    /// Release a debounced search whose quiet period has passed.
    pub fn poll_debounce(&mut self, now: Instant) -> Option<SuggestionQuery> {
        let text = self.debouncer.poll(now)?;
        if self.panel.mode() == Some(SuggestionMode::Search) {
            Some(SuggestionQuery::search(text))
        } else {
            None
        }
    }

    /// Apply a current fetch result. Ignored once the panel has closed.
    pub fn apply_result(&mut self, result: SuggestionResult) {
        let Some(mode) = self.panel.mode() else {
            debug!(pane = %self.party, "Dropping result for closed panel");
            return;
        };
        self.candidates = result.gifs;
        self.debug_info = match mode {
            SuggestionMode::Reply => result.debug_info,
            SuggestionMode::Search => None,
        };
        self.last_failure = result.failure;
        // A newer search may already be queued behind this one.
        let still_loading = self.debouncer.is_pending();
        self.set_loading(still_loading);
    }

    /// Send the draft as text, closing the panel.
    ///
    /// Whitespace-only drafts are ignored. If delivery fails, the draft and
    /// panel are left exactly as they were.
    pub fn send_text(&mut self, store: &mut ConversationStore) -> Option<Message> {
        if self.draft.trim().is_empty() {
            return None;
        }
        let outgoing = Outgoing {
            kind: MessageKind::Text,
            content: self.draft.clone(),
        };
        let message = self.deliver(outgoing, store)?;
        self.draft.clear();
        self.reset_after_send();
        Some(message)
    }

    /// Send a visible candidate as a GIF, closing the panel and clearing both inputs.
    pub fn pick_candidate(
        &mut self,
        index: usize,
        store: &mut ConversationStore,
    ) -> Option<Message> {
        if !self.panel.is_open() {
            return None;
        }
        let outgoing = Outgoing {
            kind: MessageKind::Gif,
            content: self.visible_candidates().get(index)?.url.clone(),
        };
        let message = self.deliver(outgoing, store)?;
        self.draft.clear();
        self.search_text.clear();
        self.reset_after_send();
        Some(message)
    }

    fn reset_after_send(&mut self) {
        self.panel = PanelState::Closed;
        self.debouncer.cancel();
        self.clear_results();
        self.throttle.reset();
    }

    /// Hand an outgoing message to the transport, or to the local store when
    /// there is none. Returns the message that was sent.
    pub fn deliver(&self, outgoing: Outgoing, store: &mut ConversationStore) -> Option<Message> {
        let Some(transport) = &self.transport else {
            return store.send(self.party, &outgoing.content, outgoing.kind);
        };
        if outgoing.content.trim().is_empty() {
            return None;
        }
        let message = Message::new(self.party, outgoing.content, outgoing.kind);
        match transport.send(&message) {
            Ok(()) => Some(message),
            Err(e) => {
                warn!(pane = %self.party, error = %e, "Failed to publish message");
                None
            }
        }
    }

    fn notify_typing(&mut self, now: Instant) -> TypingNotice {
        if !self.throttle.should_notify(now) {
            return TypingNotice::None;
        }
        let Some(transport) = &self.transport else {
            return TypingNotice::Local;
        };
        match transport.notify_typing() {
            Ok(()) => TypingNotice::Published,
            Err(e) => {
                warn!(pane = %self.party, error = %e, "Failed to publish typing notice");
                TypingNotice::None
            }
        }
    }

    /// The peer started (or kept) typing.
    pub fn peer_typing_notified(&mut self, now: Instant) {
        self.peer_typing.notify(now);
    }

    /// A message from the peer arrived; the indicator goes dark early.
    pub fn clear_peer_typing(&mut self) {
        self.peer_typing.clear();
    }

    /// Apply the scheduled reset of the peer typing flag.
    pub fn expire_peer_typing(&mut self, now: Instant) -> bool {
        self.peer_typing.expire(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalRelay;
    use std::sync::Arc;
    use std::time::Duration;

    fn pane() -> PaneController {
        PaneController::new(PartyId::Second, &Config::default(), None)
    }

    fn candidates(n: usize) -> SuggestionResult {
        SuggestionResult {
            gifs: (0..n)
                .map(|i| GifCandidate::new(format!("https://x/{i}.gif")))
                .collect(),
            ..SuggestionResult::default()
        }
    }

    #[test]
    fn test_open_with_last_received_fetches_reply() {
        let mut pane = pane();
        let query = pane.open_panel(Some("hello")).unwrap();

        assert_eq!(query, SuggestionQuery::reply("hello"));
        assert_eq!(
            pane.panel(),
            PanelState::Open {
                mode: SuggestionMode::Reply,
                loading: true
            }
        );
        assert_eq!(pane.open_panel(Some("hello")), None);
    }

    #[test]
    fn test_open_without_context_is_empty_and_idle() {
        let mut pane = pane();
        assert_eq!(pane.open_panel(None), None);
        assert_eq!(
            pane.panel(),
            PanelState::Open {
                mode: SuggestionMode::Reply,
                loading: false
            }
        );
        assert!(pane.visible_candidates().is_empty());
    }

    #[test]
    fn test_open_with_draft_searches_and_seeds_search_box() {
        let mut pane = pane();
        let t0 = Instant::now();
        pane.edit_draft(" dancing cat ", t0);
        let query = pane.open_panel(Some("hello")).unwrap();

        assert_eq!(query, SuggestionQuery::search("dancing cat"));
        assert_eq!(pane.search_text(), "dancing cat");
        assert_eq!(pane.panel().mode(), Some(SuggestionMode::Search));
    }

    #[test]
    fn test_results_truncated_for_display() {
        let mut pane = pane();
        pane.open_panel(Some("hello"));
        pane.apply_result(candidates(10));

        assert_eq!(pane.visible_candidates().len(), 6);
        assert!(!pane.panel().is_loading());
        assert!(pane.pick_candidate(6, &mut ConversationStore::new()).is_none());
        assert!(pane.panel().is_open());
    }

    #[test]
    fn test_reply_debug_info_hidden_in_search_mode() {
        let mut pane = pane();
        pane.open_panel(Some("hello"));
        pane.apply_result(SuggestionResult {
            debug_info: Some(DebugInfo {
                search_query: "hello happy".into(),
                ..DebugInfo::default()
            }),
            ..candidates(1)
        });
        assert_eq!(pane.debug_info().unwrap().search_query, "hello happy");

        assert_eq!(pane.set_mode(SuggestionMode::Search, Some("hello")), None);
        assert!(pane.debug_info().is_none());
        assert!(pane.visible_candidates().is_empty());
        assert!(!pane.panel().is_loading());
    }

    #[test]
    fn test_toggle_back_to_reply_refetches_context() {
        let mut pane = pane();
        pane.open_panel(Some("hello"));
        pane.set_mode(SuggestionMode::Search, Some("hello"));
        let query = pane.set_mode(SuggestionMode::Reply, Some("hello")).unwrap();
        assert_eq!(query, SuggestionQuery::reply("hello"));
        assert!(pane.panel().is_loading());
    }

    #[test]
    fn test_set_mode_on_closed_panel_is_ignored() {
        let mut pane = pane();
        assert_eq!(pane.set_mode(SuggestionMode::Reply, Some("hi")), None);
        assert_eq!(pane.panel(), PanelState::Closed);
    }

    #[test]
    fn test_search_edits_debounce_to_last_text() {
        let mut pane = pane();
        let t0 = Instant::now();
        pane.open_panel(None);
        pane.set_mode(SuggestionMode::Search, None);

        pane.edit_search("cat", t0);
        assert!(pane.panel().is_loading());
        pane.edit_search("cats", t0 + Duration::from_millis(100));

        assert_eq!(pane.poll_debounce(t0 + Duration::from_millis(300)), None);
        assert_eq!(
            pane.poll_debounce(t0 + Duration::from_millis(400)),
            Some(SuggestionQuery::search("cats"))
        );
        assert_eq!(pane.poll_debounce(t0 + Duration::from_millis(800)), None);
    }

    #[test]
    fn test_clearing_draft_drops_pending_search() {
        let mut pane = pane();
        let t0 = Instant::now();
        pane.edit_draft("cat", t0);
        assert!(pane.open_panel(None).is_some());
        pane.edit_draft("cats", t0 + Duration::from_millis(50));
        assert!(pane.next_deadline().is_some());

        pane.edit_draft("", t0 + Duration::from_millis(100));
        assert_eq!(pane.search_text(), "");
        assert!(!pane.panel().is_loading());
        assert_eq!(pane.poll_debounce(t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_failed_delivery_keeps_draft_and_panel() {
        let relay = LocalRelay::new();
        // Never opened, so every publish fails.
        let transport: SharedTransport = Arc::new(relay.connect());
        let mut pane = PaneController::new(PartyId::First, &Config::default(), Some(transport));
        let mut store = ConversationStore::new();
        pane.open_panel(Some("hello"));
        pane.apply_result(candidates(2));
        pane.edit_draft("important", Instant::now());

        assert!(pane.send_text(&mut store).is_none());
        assert!(pane.pick_candidate(0, &mut store).is_none());
        assert_eq!(pane.draft(), "important");
        assert!(pane.panel().is_open());
        assert_eq!(pane.visible_candidates().len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_live_search_disabled_waits_for_submit() {
        let mut config = Config::default();
        config.policy.live_search_on_type = false;
        let mut pane = PaneController::new(PartyId::First, &config, None);
        let t0 = Instant::now();
        pane.open_panel(None);
        pane.set_mode(SuggestionMode::Search, None);

        pane.edit_search("dogs", t0);
        assert_eq!(pane.next_deadline(), None);
        assert_eq!(pane.poll_debounce(t0 + Duration::from_secs(5)), None);
        assert_eq!(pane.submit_search(), Some(SuggestionQuery::search("dogs")));
    }

    #[test]
    fn test_submit_search_cancels_pending_debounce() {
        let mut pane = pane();
        let t0 = Instant::now();
        pane.open_panel(None);
        pane.set_mode(SuggestionMode::Search, None);
        pane.edit_search("owl", t0);

        assert_eq!(pane.submit_search(), Some(SuggestionQuery::search("owl")));
        assert_eq!(pane.poll_debounce(t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_draft_edit_in_reply_mode_does_not_search() {
        let mut pane = pane();
        let t0 = Instant::now();
        pane.open_panel(Some("hello"));
        pane.edit_draft("typing away", t0);
        assert_eq!(pane.poll_debounce(t0 + Duration::from_secs(1)), None);
        assert!(pane.is_typing());
    }

    #[test]
    fn test_send_text_closes_panel_and_resets_typing() {
        let mut pane = pane();
        let mut store = ConversationStore::new();
        let t0 = Instant::now();
        pane.open_panel(Some("hello"));
        assert_eq!(pane.edit_draft("hi there", t0), TypingNotice::Local);

        let message = pane.send_text(&mut store).unwrap();
        assert_eq!(message.kind(), MessageKind::Text);
        assert_eq!(message.content(), "hi there");
        assert_eq!(store.len(), 1);
        assert_eq!(pane.panel(), PanelState::Closed);
        assert!(!pane.is_typing());
        assert_eq!(pane.draft(), "");
    }

    #[test]
    fn test_whitespace_draft_is_not_sent() {
        let mut pane = pane();
        let mut store = ConversationStore::new();
        pane.edit_draft("   ", Instant::now());
        assert!(pane.send_text(&mut store).is_none());
        assert_eq!(pane.draft(), "   ");
        assert!(store.is_empty());
    }

    #[test]
    fn test_pick_candidate_emits_gif_and_clears_inputs() {
        let mut pane = pane();
        let t0 = Instant::now();
        pane.edit_draft("party", t0);
        pane.open_panel(None);
        pane.apply_result(candidates(3));

        let message = pane.pick_candidate(1, &mut ConversationStore::new()).unwrap();
        assert_eq!(message.kind(), MessageKind::Gif);
        assert_eq!(message.content(), "https://x/1.gif");
        assert_eq!(pane.panel(), PanelState::Closed);
        assert_eq!(pane.draft(), "");
        assert_eq!(pane.search_text(), "");
    }

    #[test]
    fn test_result_after_close_is_ignored() {
        let mut pane = pane();
        pane.open_panel(Some("hello"));
        assert!(pane.close_panel());
        pane.apply_result(candidates(2));
        assert!(pane.visible_candidates().is_empty());
        assert!(!pane.close_panel());
    }

    #[test]
    fn test_failed_result_shows_empty_state() {
        let mut pane = pane();
        pane.open_panel(Some("hello"));
        pane.apply_result(SuggestionResult::failed("Network error"));
        assert!(pane.visible_candidates().is_empty());
        assert_eq!(pane.last_failure(), Some("Network error"));
        assert!(!pane.panel().is_loading());
    }

    #[test]
    fn test_typing_notices_are_throttled() {
        let mut pane = pane();
        let t0 = Instant::now();
        assert_eq!(pane.edit_draft("h", t0), TypingNotice::Local);
        assert_eq!(
            pane.edit_draft("he", t0 + Duration::from_millis(200)),
            TypingNotice::None
        );
        assert_eq!(
            pane.edit_draft("hey", t0 + Duration::from_millis(1200)),
            TypingNotice::Local
        );
        assert_eq!(pane.edit_draft("", t0 + Duration::from_secs(3)), TypingNotice::None);
        assert!(!pane.is_typing());
    }

    #[test]
    fn test_local_delivery_goes_to_store() {
        let pane = pane();
        let mut store = ConversationStore::new();
        let message = pane
            .deliver(
                Outgoing {
                    kind: MessageKind::Text,
                    content: "yo".into(),
                },
                &mut store,
            )
            .unwrap();
        assert!(message.is_from(PartyId::Second));
        assert_eq!(store.last_received(PartyId::First), Some("yo"));
    }
}
