//! Saved prompt templates, stored as one JSON array under `prompt_list`.

use tracing::{debug, warn};

use crate::storage::kv_store::KvStore;

/// Storage key for the prompt list.
pub const PROMPT_LIST_KEY: &str = "prompt_list";

/// Ordered list of reusable prompt strings.
///
/// Like the session store, every operation degrades instead of failing:
/// a broken or missing list reads as empty and failed writes are logged.
#[derive(Debug, Clone)]
pub struct PromptCatalog<K: KvStore> {
    kv: K,
}

impl<K: KvStore> PromptCatalog<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// The stored prompts in insertion order.
    pub async fn load(&self) -> Vec<String> {
        match self.kv.get(PROMPT_LIST_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|err| {
                warn!(error = %err, "stored prompt list is unreadable");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to load prompt list");
                Vec::new()
            }
        }
    }

    /// Replace the stored list.
    pub async fn save(&self, prompts: &[String]) {
        let value = serde_json::Value::from(prompts.to_vec());
        if let Err(err) = self.kv.set(PROMPT_LIST_KEY, &value).await {
            warn!(error = %err, "failed to save prompt list");
        }
    }

    /// Append `text` to the end of the list and return the new list.
    ///
    /// Surrounding whitespace is trimmed; blank text leaves the list alone.
    /// Duplicates are kept.
    pub async fn add(&self, text: &str) -> Vec<String> {
        let mut prompts = self.load().await;
        let text = text.trim();
        if text.is_empty() {
            return prompts;
        }

        prompts.push(text.to_string());
        self.save(&prompts).await;
        debug!(count = prompts.len(), "added prompt");
        prompts
    }
}
