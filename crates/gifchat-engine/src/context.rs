//! Choosing what text to send as a suggestion query.
//!
//! Pure functions over a snapshot of pane state. Nothing here touches the
//! network or mutates the pane.

use crate::suggest::{SuggestionMode, SuggestionQuery};

/// The pane inputs that influence a suggestion query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaneContext<'a> {
    /// In-progress message text.
    pub draft: &'a str,
    /// Content of the latest message received from the peer.
    pub last_received: Option<&'a str>,
    /// Text in the GIF search box.
    pub search_text: &'a str,
}

fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Query to issue when the suggestion panel opens.
///
/// A non-empty draft is searched for directly; otherwise the last received
/// message seeds a reply query. With neither, nothing is fetched.
pub fn select_on_open(ctx: &PaneContext<'_>) -> Option<SuggestionQuery> {
    if let Some(draft) = non_empty(ctx.draft) {
        return Some(SuggestionQuery::search(draft));
    }
    reply_context(ctx).map(SuggestionQuery::reply)
}

/// Query to issue after the user explicitly switches the panel to `mode`.
///
/// Reply mode draws on the draft first and the last received message second.
/// Search mode uses only the search box.
pub fn select_for_mode(ctx: &PaneContext<'_>, mode: SuggestionMode) -> Option<SuggestionQuery> {
    match mode {
        SuggestionMode::Reply => non_empty(ctx.draft)
            .or_else(|| reply_context(ctx))
            .map(SuggestionQuery::reply),
        SuggestionMode::Search => non_empty(ctx.search_text).map(SuggestionQuery::search),
    }
}

/// Mode the panel shows after opening, whether or not a query was derived.
pub fn mode_on_open(ctx: &PaneContext<'_>) -> SuggestionMode {
    select_on_open(ctx).map_or(SuggestionMode::Reply, |query| query.mode)
}

fn reply_context<'a>(ctx: &PaneContext<'a>) -> Option<&'a str> {
    ctx.last_received.and_then(non_empty)
}
