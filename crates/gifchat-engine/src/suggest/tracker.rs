//! Outstanding suggestion requests, keyed by pane.
//!
//! Every fetch gets a [`FetchTicket`] carrying a per-pane sequence number.
//! A result is only current if its ticket is the newest one issued for that
//! pane: a slow early response can never overwrite a later one.

use crate::message::PartyId;
use std::collections::BTreeSet;

/// Identifies one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket {
    pub pane: PartyId,
    pub seq: u64,
}

/// What to do with a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Newest request for its pane; apply the result.
    Current,
    /// Superseded by a later request (or invalidated); drop the result.
    Stale,
    /// Ticket was never issued or already resolved.
    Unknown,
}

#[derive(Debug, Clone, Default)]
struct PaneSlots {
    /// Highest sequence number handed out (or burned by invalidation).
    issued: u64,
    outstanding: BTreeSet<u64>,
}

/// Arena of in-flight fetch tickets for both panes.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    panes: [PaneSlots; 2],
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next ticket for `pane`; every earlier ticket becomes stale.
    pub fn issue(&mut self, pane: PartyId) -> FetchTicket {
        let slots = &mut self.panes[pane.index()];
        slots.issued += 1;
        slots.outstanding.insert(slots.issued);
        FetchTicket {
            pane,
            seq: slots.issued,
        }
    }

    /// Mark every outstanding ticket for `pane` stale without issuing a new one.
    ///
    /// Used when the panel closes so late results are ignored.
    pub fn invalidate(&mut self, pane: PartyId) {
        self.panes[pane.index()].issued += 1;
    }

    /// Whether `ticket` is the newest issued for its pane.
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        let slots = &self.panes[ticket.pane.index()];
        slots.issued == ticket.seq && slots.outstanding.contains(&ticket.seq)
    }

    /// Retire `ticket` and report whether its result should be applied.
    pub fn resolve(&mut self, ticket: FetchTicket) -> Resolution {
        let slots = &mut self.panes[ticket.pane.index()];
        if !slots.outstanding.remove(&ticket.seq) {
            return Resolution::Unknown;
        }
        if ticket.seq == slots.issued {
            Resolution::Current
        } else {
            Resolution::Stale
        }
    }

    /// Number of fetches still awaiting a response for `pane`.
    pub fn outstanding(&self, pane: PartyId) -> usize {
        self.panes[pane.index()].outstanding.len()
    }

    /// Whether the newest fetch for `pane` is still awaiting a response.
    pub fn is_waiting(&self, pane: PartyId) -> bool {
        let slots = &self.panes[pane.index()];
        slots.outstanding.contains(&slots.issued)
    }
}
