//! Runs suggestion fetches in the background.
//!
//! Each [`FetchRequest`] becomes a tokio task; its [`FetchCompletion`] is sent
//! back over an unbounded channel for the event loop to apply. In-flight tasks
//! are never aborted. Staleness is decided when the completion is applied.

use crate::session::{FetchCompletion, FetchRequest};
use crate::suggest::SuggestionClient;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};

/// Spawns fetches and reports their results.
#[derive(Debug, Clone)]
pub struct FetchDispatcher {
    client: SuggestionClient,
    tx: mpsc::UnboundedSender<FetchCompletion>,
}

impl FetchDispatcher {
    /// Create a dispatcher and the receiver its completions arrive on.
    pub fn new(client: SuggestionClient) -> (Self, mpsc::UnboundedReceiver<FetchCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { client, tx }, rx)
    }

    pub fn client(&self) -> &SuggestionClient {
        &self.client
    }

    /// Start fetching `request` on the current tokio runtime.
    pub fn dispatch(&self, request: FetchRequest) -> JoinHandle<()> {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let span = tracing::debug_span!(
            "fetch",
            pane = %request.ticket.pane,
            seq = request.ticket.seq
        );

        tokio::spawn(
            async move {
                let result = client.fetch(&request.query).await;
                let completion = FetchCompletion {
                    ticket: request.ticket,
                    result,
                };
                if tx.send(completion).is_err() {
                    debug!("Completion receiver dropped");
                }
            }
            .instrument(span),
        )
    }

    pub fn dispatch_all(&self, requests: impl IntoIterator<Item = FetchRequest>) {
        for request in requests {
            self.dispatch(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::message::PartyId;
    use crate::session::ChatSession;
    use crate::suggest::{Resolution, SuggestionMode};
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn search_reply(url: &str) -> serde_json::Value {
        serde_json::json!([{ "url": url }])
    }

    #[tokio::test]
    async fn test_slow_early_response_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/search-gifs"))
            .and(body_json(serde_json::json!({ "text": "cat" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(search_reply("https://x/cat.gif"))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/search-gifs"))
            .and(body_json(serde_json::json!({ "text": "cats" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_reply("https://x/cats.gif")))
            .mount(&server)
            .await;

        let client = SuggestionClient::with_http_client(reqwest::Client::new(), &server.uri());
        let (dispatcher, mut rx) = FetchDispatcher::new(client);
        let mut session = ChatSession::new(&Config::default());
        session.open_panel(PartyId::First);
        session.set_mode(PartyId::First, SuggestionMode::Search);

        session.edit_search(PartyId::First, "cat", tokio::time::Instant::now());
        let slow = session.submit_search(PartyId::First).unwrap();
        dispatcher.dispatch(slow);
        session.edit_search(PartyId::First, "cats", tokio::time::Instant::now());
        let fast = session.submit_search(PartyId::First).unwrap();
        dispatcher.dispatch(fast);

        let first = rx.recv().await.unwrap();
        assert_eq!(session.apply_fetch(first), Resolution::Current);
        let second = rx.recv().await.unwrap();
        assert_eq!(session.apply_fetch(second), Resolution::Stale);

        let shown = session.pane(PartyId::First).visible_candidates();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].url, "https://x/cats.gif");
    }

    #[tokio::test]
    async fn test_failed_fetch_still_completes() {
        let client = SuggestionClient::with_http_client(reqwest::Client::new(), "http://127.0.0.1:9");
        let (dispatcher, mut rx) = FetchDispatcher::new(client);
        let mut session = ChatSession::new(&Config::default());
        session.edit_draft(PartyId::Second, "hello", tokio::time::Instant::now());
        session.send_text(PartyId::Second);

        dispatcher.dispatch_all(session.open_panel(PartyId::First));
        let completion = rx.recv().await.unwrap();

        assert!(completion.result.is_failure());
        assert_eq!(session.apply_fetch(completion), Resolution::Current);
        let pane = session.pane(PartyId::First);
        assert!(pane.visible_candidates().is_empty());
        assert!(pane.last_failure().is_some());
        assert!(!pane.panel().is_loading());
    }
}
