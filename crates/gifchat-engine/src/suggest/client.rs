//! HTTP client for the GIF suggestion backend.

use super::types::{decode_body, SuggestionMode, SuggestionQuery, SuggestionResult, WireRequest};
use crate::config::BackendConfig;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, warn};

/// Which of the failure classes a [`SuggestionError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request could not complete (connect, timeout, HTTP error status).
    Network,
    /// The response body was not what the endpoint promises.
    Decode,
    /// There was nothing to ask for. Not a real failure.
    EmptyQuery,
}

/// Errors from a single suggestion request.
#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    /// Query text was empty after trimming.
    #[error("Suggestion query is empty")]
    EmptyQuery,

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Body did not decode.
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

impl SuggestionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::EmptyQuery => FailureKind::EmptyQuery,
            Self::Network(_) | Self::Status { .. } => FailureKind::Network,
            Self::Decode(_) => FailureKind::Decode,
        }
    }
}

/// Issues suggestion queries against the backend.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SuggestionClient {
    http: Client,
    base_url: String,
}

impl SuggestionClient {
    /// Build a client for the configured backend.
    pub fn new(config: &BackendConfig) -> Result<Self, SuggestionError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_http_client(http, &config.base_url))
    }

    /// Build a client around an existing `reqwest` client.
    pub fn with_http_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, mode: SuggestionMode) -> String {
        format!("{}{}", self.base_url, mode.endpoint())
    }

    /// Fetch suggestions, folding every failure into an empty result.
    ///
    /// Failures are logged and carried in [`SuggestionResult::failure`].
    pub async fn fetch(&self, query: &SuggestionQuery) -> SuggestionResult {
        match self.try_fetch(query).await {
            Ok(result) => result,
            Err(SuggestionError::EmptyQuery) => {
                debug!(mode = ?query.mode, "Skipping suggestion fetch with empty query");
                SuggestionResult::empty()
            }
            Err(e) => {
                warn!(mode = ?query.mode, kind = ?e.kind(), error = %e, "Suggestion fetch failed");
                SuggestionResult::failed(e.to_string())
            }
        }
    }

    /// Fetch suggestions, surfacing failures.
    pub async fn try_fetch(
        &self,
        query: &SuggestionQuery,
    ) -> Result<SuggestionResult, SuggestionError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Err(SuggestionError::EmptyQuery);
        }

        let start = Instant::now();
        let response = self
            .http
            .post(self.endpoint_url(query.mode))
            .json(&WireRequest { text })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SuggestionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result = decode_body(query.mode, &body).map_err(SuggestionError::Decode)?;

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            mode = ?query.mode,
            candidates = result.gifs.len(),
            duration_ms,
            "Suggestion fetch completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SuggestionClient {
        SuggestionClient::with_http_client(Client::new(), &server.uri())
    }

    #[tokio::test]
    async fn test_reply_fetch_hits_context_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/gif-suggestions"))
            .and(body_json(json!({"text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "gifs": [{"url": "https://x/1.gif", "similarity": 0.5}],
                "debug_info": {
                    "replies": ["hi!"],
                    "contexts": [],
                    "adjectives": ["friendly"],
                    "search_query": "hello friendly"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .try_fetch(&SuggestionQuery::reply("  hello "))
            .await
            .unwrap();

        assert_eq!(result.gifs.len(), 1);
        assert_eq!(result.gifs[0].similarity, Some(0.5));
        assert_eq!(result.debug_info.unwrap().search_query, "hello friendly");
    }

    #[tokio::test]
    async fn test_search_fetch_hits_search_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/search-gifs"))
            .and(body_json(json!({"text": "cats"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"url": "https://x/cats.gif"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .fetch(&SuggestionQuery::search("cats"))
            .await;

        assert!(!result.is_failure());
        assert_eq!(result.gifs[0].url, "https://x/cats.gif");
        assert!(result.debug_info.is_none());
    }

    #[tokio::test]
    async fn test_server_error_becomes_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .try_fetch(&SuggestionQuery::reply("hello"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Network);

        let result = client.fetch(&SuggestionQuery::reply("hello")).await;
        assert!(result.gifs.is_empty());
        assert!(result.failure.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .try_fetch(&SuggestionQuery::search("cats"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);

        let result = client.fetch(&SuggestionQuery::search("cats")).await;
        assert!(result.is_failure());
        assert!(result.gifs.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_failure() {
        // Nothing listens on port 9 locally.
        let client = SuggestionClient::with_http_client(Client::new(), "http://127.0.0.1:9");
        let err = client
            .try_fetch(&SuggestionQuery::reply("hello"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Network);
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .try_fetch(&SuggestionQuery::search("   "))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::EmptyQuery);

        let result = client.fetch(&SuggestionQuery::search("")).await;
        assert_eq!(result, SuggestionResult::empty());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = SuggestionClient::with_http_client(Client::new(), "http://host:8000/");
        assert_eq!(
            client.endpoint_url(SuggestionMode::Search),
            "http://host:8000/api/search-gifs"
        );
    }
}
