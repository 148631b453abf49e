//! Suggestion query and result types, plus the backend wire format.

use serde::{Deserialize, Serialize};

/// Which kind of suggestion the pane is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionMode {
    /// GIFs that reply to conversational context.
    #[default]
    Reply,
    /// GIFs matching an explicit search string.
    Search,
}

impl SuggestionMode {
    /// Backend path serving this mode.
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Reply => "/api/gif-suggestions",
            Self::Search => "/api/search-gifs",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Reply => "Reply GIFs",
            Self::Search => "Search GIFs",
        }
    }
}

/// Text and mode for one suggestion fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionQuery {
    pub text: String,
    pub mode: SuggestionMode,
}

impl SuggestionQuery {
    pub fn new(text: impl Into<String>, mode: SuggestionMode) -> Self {
        Self {
            text: text.into(),
            mode,
        }
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self::new(text, SuggestionMode::Reply)
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self::new(text, SuggestionMode::Search)
    }
}

/// A GIF offered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GifCandidate {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Relevance score in `[0, 1]`, display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl GifCandidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            preview_url: None,
            title: None,
            similarity: None,
        }
    }

    /// Asset to show in the suggestion grid: the preview if there is one.
    pub fn thumbnail(&self) -> &str {
        self.preview_url.as_deref().unwrap_or(&self.url)
    }

    /// Title for display, `"GIF"` when the backend sent none.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => "GIF",
        }
    }
}

/// How the backend derived a reply-mode query. Passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebugInfo {
    #[serde(default)]
    pub replies: Vec<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub search_query: String,
}

/// Normalized outcome of one suggestion fetch.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SuggestionResult {
    pub gifs: Vec<GifCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
    /// Diagnostic text when the fetch failed; `gifs` is empty in that case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl SuggestionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Request body for both endpoints.
#[derive(Debug, Serialize)]
pub(crate) struct WireRequest<'a> {
    pub text: &'a str,
}

/// A candidate as the backend sends it. `url` may be missing on bad entries.
#[derive(Debug, Deserialize)]
pub(crate) struct WireGif {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    preview: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    similarity: Option<f32>,
}

/// Reply endpoint body: the `{gifs, debug_info}` envelope or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireReplyBody {
    Envelope {
        #[serde(default)]
        gifs: Vec<WireGif>,
        #[serde(default)]
        debug_info: Option<DebugInfo>,
    },
    Bare(Vec<WireGif>),
}

/// Normalize wire candidates, dropping entries without a usable URL.
pub(crate) fn normalize_gifs(wire: Vec<WireGif>) -> Vec<GifCandidate> {
    wire.into_iter()
        .filter_map(|gif| {
            let url = gif.url.filter(|url| !url.trim().is_empty())?;
            Some(GifCandidate {
                url,
                preview_url: gif.preview.filter(|p| !p.trim().is_empty()),
                title: gif.title,
                similarity: gif.similarity.map(|s| s.clamp(0.0, 1.0)),
            })
        })
        .collect()
}

/// Decode a response body for `mode` into a [`SuggestionResult`].
pub(crate) fn decode_body(
    mode: SuggestionMode,
    body: &str,
) -> Result<SuggestionResult, serde_json::Error> {
    match mode {
        SuggestionMode::Reply => {
            let (gifs, debug_info) = match serde_json::from_str::<WireReplyBody>(body)? {
                WireReplyBody::Envelope { gifs, debug_info } => (gifs, debug_info),
                WireReplyBody::Bare(gifs) => (gifs, None),
            };
            Ok(SuggestionResult {
                gifs: normalize_gifs(gifs),
                debug_info,
                failure: None,
            })
        }
        SuggestionMode::Search => {
            let gifs: Vec<WireGif> = serde_json::from_str(body)?;
            Ok(SuggestionResult {
                gifs: normalize_gifs(gifs),
                debug_info: None,
                failure: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_envelope_decodes_with_debug_info() {
        let body = r#"{
            "gifs": [
                {"id": "a1", "url": "https://x/1.gif", "preview": "https://x/1.png", "title": "Yay", "similarity": 0.82},
                {"url": "https://x/2.gif"}
            ],
            "debug_info": {
                "replies": ["nice!"],
                "contexts": ["greeting"],
                "adjectives": ["happy"],
                "search_query": "hello happy"
            }
        }"#;
        let result = decode_body(SuggestionMode::Reply, body).unwrap();

        assert_eq!(result.gifs.len(), 2);
        assert_eq!(result.gifs[0].thumbnail(), "https://x/1.png");
        assert_eq!(result.gifs[0].display_title(), "Yay");
        assert_eq!(result.gifs[1].thumbnail(), "https://x/2.gif");
        assert_eq!(result.gifs[1].display_title(), "GIF");
        let debug = result.debug_info.unwrap();
        assert_eq!(debug.search_query, "hello happy");
        assert_eq!(debug.adjectives, ["happy"]);
    }

    #[test]
    fn test_reply_bare_list_is_accepted() {
        let body = r#"[{"url": "https://x/1.gif", "title": ""}]"#;
        let result = decode_body(SuggestionMode::Reply, body).unwrap();
        assert_eq!(result.gifs.len(), 1);
        assert!(result.debug_info.is_none());
    }

    #[test]
    fn test_search_body_is_bare_list() {
        let body = r#"[{"url": "https://x/cat.gif"}, {"url": "https://x/cats.gif"}]"#;
        let result = decode_body(SuggestionMode::Search, body).unwrap();
        let urls: Vec<_> = result.gifs.iter().map(|g| g.url.as_str()).collect();
        assert_eq!(urls, ["https://x/cat.gif", "https://x/cats.gif"]);
        assert!(result.debug_info.is_none());
    }

    #[test]
    fn test_search_envelope_is_decode_error() {
        let body = r#"{"gifs": []}"#;
        assert!(decode_body(SuggestionMode::Search, body).is_err());
    }

    #[test]
    fn test_candidates_without_url_are_dropped_and_scores_clamped() {
        let body = r#"[
            {"url": null, "title": "broken"},
            {"url": "  "},
            {"url": "https://x/ok.gif", "similarity": 1.7}
        ]"#;
        let result = decode_body(SuggestionMode::Search, body).unwrap();
        assert_eq!(result.gifs.len(), 1);
        assert_eq!(result.gifs[0].similarity, Some(1.0));
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(SuggestionMode::Reply.endpoint(), "/api/gif-suggestions");
        assert_eq!(SuggestionMode::Search.endpoint(), "/api/search-gifs");
    }
}
