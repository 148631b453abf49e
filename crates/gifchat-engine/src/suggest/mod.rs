//! GIF suggestion retrieval.
//!
//! - [`SuggestionClient`]: HTTP calls to the reply and search endpoints
//! - [`Debouncer`]: quiet-period scheduling for search-as-you-type
//! - [`RequestTracker`]: per-pane sequence numbers for discarding stale results

mod client;
mod debounce;
mod tracker;
mod types;

pub use client::{FailureKind, SuggestionClient, SuggestionError};
pub use debounce::Debouncer;
pub use tracker::{FetchTicket, RequestTracker, Resolution};
pub use types::{DebugInfo, GifCandidate, SuggestionMode, SuggestionQuery, SuggestionResult};
