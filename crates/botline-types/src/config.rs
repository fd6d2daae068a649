//! Configuration types for Botline.
//!
//! `BotlineConfig` represents the host's `config.toml`: the configured bots,
//! where conversations are stored, and transport-level HTTP settings.
//! Every section has sensible defaults so an empty file is valid.

use serde::{Deserialize, Serialize};

use crate::bot::{BotDescriptor, BotId};

/// Default chat-completion endpoint.
pub const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model sent to the completion endpoint.
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotlineConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub http: HttpConfig,

    /// Configured bots, in display order.
    #[serde(default)]
    pub bots: Vec<BotDescriptor>,
}

impl BotlineConfig {
    /// Look up a configured bot by id.
    pub fn bot(&self, id: &BotId) -> Option<&BotDescriptor> {
        self.bots.iter().find(|b| &b.id == id)
    }
}

/// Where conversation snapshots and prompts are persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database URL. Falls back to `<data_dir>/botline.db` when unset.
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Transport-level HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Client-side timeout for a single backend request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_completion_endpoint")]
    pub completion_endpoint: String,

    #[serde(default = "default_completion_model")]
    pub completion_model: String,

    /// Default search-chat endpoint for bots that do not set their own.
    #[serde(default)]
    pub search_endpoint: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_completion_endpoint() -> String {
    DEFAULT_COMPLETION_ENDPOINT.to_string()
}

fn default_completion_model() -> String {
    DEFAULT_COMPLETION_MODEL.to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            completion_endpoint: default_completion_endpoint(),
            completion_model: default_completion_model(),
            search_endpoint: None,
        }
    }
}
