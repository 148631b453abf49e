//! The two-pane chat session.
//!
//! [`ChatSession`] owns the conversation store, both pane controllers and the
//! request tracker. All of its methods are synchronous: whenever an intent
//! needs suggestions it hands back a [`FetchRequest`], and the caller runs the
//! fetch (see [`crate::dispatch::FetchDispatcher`]) and feeds the
//! [`FetchCompletion`] back through [`ChatSession::apply_fetch`].

use crate::config::Config;
use crate::message::{Message, PartyId};
use crate::pane::{PaneController, TypingNotice};
use crate::store::ConversationStore;
use crate::suggest::{
    FetchTicket, RequestTracker, Resolution, SuggestionMode, SuggestionQuery, SuggestionResult,
};
use crate::transport::{SharedTransport, Subscription, TransportError, TransportEvent};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A fetch the session wants run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub query: SuggestionQuery,
}

/// A finished fetch, ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchCompletion {
    pub ticket: FetchTicket,
    pub result: SuggestionResult,
}

/// Both panes of one conversation.
#[derive(Debug)]
pub struct ChatSession {
    config: Config,
    store: ConversationStore,
    panes: [PaneController; 2],
    tracker: RequestTracker,
    subscriptions: [Option<Subscription>; 2],
}

impl ChatSession {
    /// Create a session where sends go straight into the in-process store.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            store: ConversationStore::with_gif_receipt_policy(
                config.policy.gif_receipt_updates_context,
            ),
            panes: PartyId::ALL.map(|party| PaneController::new(party, config, None)),
            tracker: RequestTracker::new(),
            subscriptions: [None, None],
        }
    }

    /// Create a session whose panes talk through `transports`, one per party.
    ///
    /// Both transports are subscribed before either joins, then opened with
    /// the configured party names. If either fails to open, both are closed.
    pub fn with_transports(
        config: &Config,
        transports: [SharedTransport; 2],
    ) -> Result<Self, TransportError> {
        let subscriptions = transports.each_ref().map(|t| Some(t.subscribe()));
        for party in PartyId::ALL {
            if let Err(e) = transports[party.index()].open(config.party_name(party)) {
                warn!(pane = %party, error = %e, "Transport failed to open");
                for transport in &transports {
                    transport.close();
                }
                return Err(e);
            }
        }

        let [first, second] = transports;
        let mut session = Self::new(config);
        session.panes = [
            PaneController::new(PartyId::First, config, Some(first)),
            PaneController::new(PartyId::Second, config, Some(second)),
        ];
        session.subscriptions = subscriptions;
        info!("Chat session connected through transport");
        Ok(session)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn pane(&self, party: PartyId) -> &PaneController {
        &self.panes[party.index()]
    }

    pub fn history(&self, party: PartyId) -> &[Message] {
        self.store.history(party)
    }

    pub fn last_received(&self, party: PartyId) -> Option<&str> {
        self.store.last_received(party)
    }

    /// Whether the newest fetch for `party` has not come back yet.
    pub fn is_fetching(&self, party: PartyId) -> bool {
        self.tracker.is_waiting(party)
    }

    pub fn is_connected(&self) -> bool {
        self.subscriptions.iter().any(Option::is_some)
    }

    /// Relay events either pane missed by falling behind. Zero while the
    /// histories still mirror each other.
    pub fn dropped_events(&self) -> u64 {
        self.subscriptions
            .iter()
            .flatten()
            .map(Subscription::dropped)
            .sum()
    }

    fn request(&mut self, party: PartyId, query: Option<SuggestionQuery>) -> Option<FetchRequest> {
        let query = query?;
        let ticket = self.tracker.issue(party);
        debug!(pane = %party, seq = ticket.seq, mode = ?query.mode, "Suggestion fetch issued");
        Some(FetchRequest { ticket, query })
    }

    /// Open the panel if closed, close it if open.
    pub fn toggle_panel(&mut self, party: PartyId) -> Option<FetchRequest> {
        if self.pane(party).panel().is_open() {
            self.close_panel(party);
            None
        } else {
            self.open_panel(party)
        }
    }

    pub fn open_panel(&mut self, party: PartyId) -> Option<FetchRequest> {
        let query = self.panes[party.index()].open_panel(self.store.last_received(party));
        self.request(party, query)
    }

    /// Close the panel. Fetches still in flight for it are discarded on arrival.
    pub fn close_panel(&mut self, party: PartyId) -> bool {
        let closed = self.panes[party.index()].close_panel();
        if closed {
            self.tracker.invalidate(party);
        }
        closed
    }

    pub fn set_mode(&mut self, party: PartyId, mode: SuggestionMode) -> Option<FetchRequest> {
        let pane = &mut self.panes[party.index()];
        if !pane.panel().is_open() {
            return None;
        }
        let query = pane.set_mode(mode, self.store.last_received(party));
        if query.is_none() {
            self.tracker.invalidate(party);
        }
        self.request(party, query)
    }

    /// Replace the draft text of `party`'s pane.
    pub fn edit_draft(&mut self, party: PartyId, text: impl Into<String>, now: Instant) {
        let notice = self.panes[party.index()].edit_draft(text, now);
        if notice == TypingNotice::Local {
            self.panes[party.peer().index()].peer_typing_notified(now);
        }
    }

    pub fn edit_search(&mut self, party: PartyId, text: impl Into<String>, now: Instant) {
        self.panes[party.index()].edit_search(text, now);
    }

    pub fn submit_search(&mut self, party: PartyId) -> Option<FetchRequest> {
        let query = self.panes[party.index()].submit_search();
        self.request(party, query)
    }

    /// Send the draft as a text message.
    pub fn send_text(&mut self, party: PartyId) -> Option<Message> {
        let message = self.panes[party.index()].send_text(&mut self.store)?;
        self.after_send(party);
        Some(message)
    }

    /// Send the `index`th visible candidate as a GIF message.
    pub fn pick_candidate(&mut self, party: PartyId, index: usize) -> Option<Message> {
        let message = self.panes[party.index()].pick_candidate(index, &mut self.store)?;
        self.after_send(party);
        Some(message)
    }

    fn after_send(&mut self, party: PartyId) {
        self.tracker.invalidate(party);
        if self.pane(party).transport().is_none() {
            self.panes[party.peer().index()].clear_peer_typing();
        }
    }

    /// Fire due timers: debounced searches and typing indicator resets.
    pub fn poll_timers(&mut self, now: Instant) -> Vec<FetchRequest> {
        let mut requests = Vec::new();
        for party in PartyId::ALL {
            let pane = &mut self.panes[party.index()];
            pane.expire_peer_typing(now);
            let query = pane.poll_debounce(now);
            requests.extend(self.request(party, query));
        }
        requests
    }

    /// Earliest instant at which [`Self::poll_timers`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.panes.iter().filter_map(PaneController::next_deadline).min()
    }

    /// Apply a completed fetch if it is still the newest for its pane.
    pub fn apply_fetch(&mut self, completion: FetchCompletion) -> Resolution {
        let FetchCompletion { ticket, result } = completion;
        let resolution = self.tracker.resolve(ticket);
        match resolution {
            Resolution::Current => {
                debug!(
                    pane = %ticket.pane,
                    seq = ticket.seq,
                    candidates = result.gifs.len(),
                    "Applying suggestion result"
                );
                self.panes[ticket.pane.index()].apply_result(result);
            }
            Resolution::Stale => {
                debug!(pane = %ticket.pane, seq = ticket.seq, "Discarding stale suggestion result");
            }
            Resolution::Unknown => {
                warn!(pane = %ticket.pane, seq = ticket.seq, "Result for unknown fetch ticket");
            }
        }
        resolution
    }

    /// Drain buffered transport events into the panes. Returns how many were handled.
    pub fn pump_transport(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        for party in PartyId::ALL {
            loop {
                let Some(event) = self.subscriptions[party.index()]
                    .as_mut()
                    .and_then(Subscription::try_next)
                else {
                    break;
                };
                self.handle_event(party, event, now);
                handled += 1;
            }
        }
        handled
    }

    fn handle_event(&mut self, party: PartyId, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::Message(payload) => {
                let Some(sender) = self.config.party_by_name(&payload.username) else {
                    warn!(pane = %party, username = %payload.username, "Message from unknown user");
                    return;
                };
                let Some(message) = payload.into_message(sender) else {
                    warn!(pane = %party, "Message without text or GIF");
                    return;
                };
                if sender != party {
                    self.panes[party.index()].clear_peer_typing();
                }
                self.store.receive(party, message);
            }
            TransportEvent::PeerTyping { username } => {
                if self.config.party_by_name(&username) != Some(party) {
                    self.panes[party.index()].peer_typing_notified(now);
                }
            }
            TransportEvent::PeerJoined { username } => {
                info!(pane = %party, %username, "Peer joined");
            }
        }
    }

    /// Close every transport connection.
    pub fn shutdown(&mut self) {
        for pane in &self.panes {
            if let Some(transport) = pane.transport() {
                transport.close();
            }
        }
        self.subscriptions = [None, None];
    }
}
