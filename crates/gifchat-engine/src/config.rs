//! Configuration types for the gifchat engine.
//!
//! This module defines the configuration schema: where the suggestion backend
//! lives, the suggestion policy shared by both panes, and typing-indicator
//! timing.

use crate::message::PartyId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for gifchat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Suggestion backend connection settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Suggestion behavior shared by both panes.
    #[serde(default)]
    pub policy: SuggestionPolicy,

    /// Typing indicator timing.
    #[serde(default)]
    pub typing: TypingConfig,

    /// Display names for the two parties, also used as wire usernames.
    #[serde(default = "default_parties")]
    pub parties: [String; 2],
}

fn default_parties() -> [String; 2] {
    ["User 1".into(), "User 2".into()]
}

/// Where the suggestion backend lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL; endpoint paths are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Policy knobs that distinguish the presentation variants of the chat pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionPolicy {
    /// Fetch search results while the user types (debounced), not only on submit.
    #[serde(default = "default_true")]
    pub live_search_on_type: bool,

    /// Maximum number of candidates the pane exposes for display.
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    /// Whether a received GIF replaces the pane's reply context with a placeholder.
    #[serde(default)]
    pub gif_receipt_updates_context: bool,

    /// Quiet period before a search edit turns into a fetch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_suggestions() -> usize {
    6
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for SuggestionPolicy {
    fn default() -> Self {
        Self {
            live_search_on_type: true,
            max_suggestions: default_max_suggestions(),
            gif_receipt_updates_context: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl SuggestionPolicy {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Typing indicator timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingConfig {
    /// How long a "peer is typing" notification stays visible.
    #[serde(default = "default_typing_window_ms")]
    pub peer_window_ms: u64,

    /// Minimum gap between outbound typing notifications from one pane.
    #[serde(default = "default_typing_window_ms")]
    pub notify_interval_ms: u64,
}

fn default_typing_window_ms() -> u64 {
    1_000
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            peer_window_ms: default_typing_window_ms(),
            notify_interval_ms: default_typing_window_ms(),
        }
    }
}

impl TypingConfig {
    pub fn peer_window(&self) -> Duration {
        Duration::from_millis(self.peer_window_ms)
    }

    pub fn notify_interval(&self) -> Duration {
        Duration::from_millis(self.notify_interval_ms)
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Load configuration from a file, falling back to defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    /// Display name (and wire username) for a party.
    pub fn party_name(&self, party: PartyId) -> &str {
        &self.parties[party.index()]
    }

    /// Resolve a wire username back to a party.
    pub fn party_by_name(&self, name: &str) -> Option<PartyId> {
        PartyId::ALL
            .into_iter()
            .find(|party| self.parties[party.index()] == name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            policy: SuggestionPolicy::default(),
            typing: TypingConfig::default(),
            parties: default_parties(),
        }
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading or writing config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing config JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Error serializing config to JSON.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
}
