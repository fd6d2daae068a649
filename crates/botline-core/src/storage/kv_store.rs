//! Key-value store trait.
//!
//! Defines the interface for the flat key namespace that backs session
//! snapshots (`conv_<botId>`) and the prompt list (`prompt_list`).
//! Implementations live in botline-infra.

use botline_types::error::PersistenceError;

/// Trait for key-value persistent storage.
///
/// Stores arbitrary JSON values keyed by string.
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait KvStore: Send + Sync {
    /// Get a value by key. Returns None if the key does not exist.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<serde_json::Value>, PersistenceError>> + Send;

    /// Set a value for a key (upsert).
    fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// Delete a key. No-op if key does not exist.
    fn delete(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// List all keys starting with `prefix`, in ascending order.
    fn list_keys(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, PersistenceError>> + Send;
}
