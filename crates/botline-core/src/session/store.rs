//! Session store: durable per-bot mirror of a conversation.
//!
//! Snapshots live under `conv_<botId>` as a JSON array of messages. The store
//! never fails towards its caller -- persistence errors are logged and
//! degrade to a no-op (save, clear) or an empty session (load).

use botline_types::bot::BotId;
use botline_types::message::Message;
use tracing::{debug, warn};

use crate::storage::kv_store::KvStore;

/// Key prefix for session snapshots.
pub const SESSION_KEY_PREFIX: &str = "conv_";

/// Storage key for a bot's session snapshot.
pub fn session_key(bot_id: &BotId) -> String {
    format!("{SESSION_KEY_PREFIX}{bot_id}")
}

/// Per-bot message list persistence over a [`KvStore`].
#[derive(Debug, Clone)]
pub struct SessionStore<K: KvStore> {
    kv: K,
}

impl<K: KvStore> SessionStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Access the underlying key-value store.
    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Persist `messages` as the snapshot for `bot_id`.
    pub async fn save(&self, bot_id: &BotId, messages: &[Message]) {
        let value = match serde_json::to_value(messages) {
            Ok(value) => value,
            Err(err) => {
                warn!(%bot_id, error = %err, "failed to serialize conversation");
                return;
            }
        };

        if let Err(err) = self.kv.set(&session_key(bot_id), &value).await {
            warn!(%bot_id, error = %err, "failed to save conversation");
        }
    }

    /// Load the snapshot for `bot_id`.
    ///
    /// Returns an empty session when nothing is stored, when the stored
    /// value is not a message list, or when the backing store fails.
    pub async fn load(&self, bot_id: &BotId) -> Vec<Message> {
        let value = match self.kv.get(&session_key(bot_id)).await {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(%bot_id, error = %err, "failed to load conversation");
                return Vec::new();
            }
        };

        match serde_json::from_value::<Vec<Message>>(value) {
            Ok(messages) => {
                debug!(%bot_id, count = messages.len(), "loaded conversation");
                messages
            }
            Err(err) => {
                warn!(%bot_id, error = %err, "stored conversation is unreadable");
                Vec::new()
            }
        }
    }

    /// Drop the snapshot for `bot_id`.
    pub async fn clear(&self, bot_id: &BotId) {
        if let Err(err) = self.kv.delete(&session_key(bot_id)).await {
            warn!(%bot_id, error = %err, "failed to clear conversation");
        }
    }

    /// Bots that currently have a stored snapshot.
    pub async fn stored_bot_ids(&self) -> Vec<BotId> {
        match self.kv.list_keys(SESSION_KEY_PREFIX).await {
            Ok(keys) => keys
                .iter()
                .filter_map(|k| k.strip_prefix(SESSION_KEY_PREFIX))
                .map(BotId::from)
                .collect(),
            Err(err) => {
                warn!(error = %err, "failed to list stored conversations");
                Vec::new()
            }
        }
    }
}
