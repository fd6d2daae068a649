use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Stable identity of a bot configuration.
///
/// Bot ids are chosen by the host application (e.g. `"gpt"`, `"bing"`), so
/// this wraps a plain string rather than a generated UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotId(pub String);

impl BotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BotId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transport kind a bot is reached through.
///
/// The three known platforms each map to exactly one transport strategy.
/// Any other label parses into `Other` so that a descriptor carrying an
/// unknown platform can still be loaded and rejected at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    /// REST chat-completion API.
    CompletionApi,
    /// Browser-embedded web chat reached through the content channel.
    WebChat,
    /// Third-party search-chat service.
    SearchChat,
    /// Unrecognised platform label.
    Other(String),
}

impl Platform {
    /// Whether this platform keeps conversation context on the backend side.
    pub fn is_stateful(&self) -> bool {
        matches!(self, Platform::WebChat)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::CompletionApi => write!(f, "completion_api"),
            Platform::WebChat => write!(f, "web_chat"),
            Platform::SearchChat => write!(f, "search_chat"),
            Platform::Other(label) => write!(f, "{label}"),
        }
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "completion_api" | "ChatGPT-API" => Platform::CompletionApi,
            "web_chat" | "ChatGPT-Web" => Platform::WebChat,
            "search_chat" | "Bing" => Platform::SearchChat,
            other => Platform::Other(other.to_string()),
        })
    }
}

impl Serialize for Platform {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        let Ok(platform) = label.parse::<Platform>();
        Ok(platform)
    }
}

/// Platform-specific settings supplied by the host application.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Override for the transport's default endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bearer credential passed to the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier for completion backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// Hand-written so the credential never shows up in logs.
impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .finish()
    }
}

/// A configured conversational backend.
///
/// Immutable for the lifetime of a conversation view; switching bots swaps
/// the active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotDescriptor {
    pub id: BotId,
    /// Display label, also used as the sender of the bot's messages.
    pub name: String,
    pub platform: Platform,
    #[serde(default)]
    pub config: PlatformConfig,
}

impl BotDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, platform: Platform) -> Self {
        Self {
            id: BotId::new(id),
            name: name.into(),
            platform,
            config: PlatformConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PlatformConfig) -> Self {
        self.config = config;
        self
    }
}
