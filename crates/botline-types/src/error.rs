use thiserror::Error;

/// Errors from dispatching a prompt to a bot backend.
///
/// `Cancelled` is kept apart from `Transport` so callers never report a
/// user-initiated stop as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unsupported bot platform: '{0}'")]
    UnsupportedPlatform(String),

    #[error("transport error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("request cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Shorthand for a transport failure without a backend status code.
    pub fn transport(message: impl Into<String>) -> Self {
        DispatchError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled)
    }

    /// Backend status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Errors from key-value persistence (used by trait definitions in botline-core).
///
/// These never cross the Session Store / Prompt Catalog boundary; the stores
/// log them and degrade to a no-op or an empty result.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("invalid config: {0}")]
    Parse(String),
}
