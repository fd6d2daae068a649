//! Test doubles shared by the gateway, store and controller tests.

use std::sync::{Arc, Mutex};

use botline_types::bot::{BotDescriptor, Platform};
use botline_types::error::{DispatchError, PersistenceError};
use tokio::sync::Semaphore;

use crate::dispatch::transport::Transport;
use crate::storage::kv_store::KvStore;

/// `KvStore` whose every operation fails.
pub struct FailingKvStore;

impl KvStore for FailingKvStore {
    async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>, PersistenceError> {
        Err(PersistenceError::Connection)
    }

    async fn set(&self, _key: &str, _value: &serde_json::Value) -> Result<(), PersistenceError> {
        Err(PersistenceError::Connection)
    }

    async fn delete(&self, _key: &str) -> Result<(), PersistenceError> {
        Err(PersistenceError::Connection)
    }

    async fn list_keys(&self, _prefix: &str) -> Result<Vec<String>, PersistenceError> {
        Err(PersistenceError::Connection)
    }
}

/// Calls observed by a fake transport.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    pub prompts: Arc<Mutex<Vec<String>>>,
    pub resets: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn resets(&self) -> Vec<String> {
        self.resets.lock().unwrap().clone()
    }
}

/// Replies `"<name>: <prompt>"` immediately.
pub struct EchoTransport {
    pub platform: Platform,
    pub log: CallLog,
}

impl EchoTransport {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            log: CallLog::default(),
        }
    }
}

impl Transport for EchoTransport {
    fn name(&self) -> &str {
        "echo"
    }

    fn platform(&self) -> Platform {
        self.platform.clone()
    }

    async fn execute(&self, bot: &BotDescriptor, prompt: &str) -> Result<String, DispatchError> {
        self.log.prompts.lock().unwrap().push(prompt.to_string());
        Ok(format!("{}: {prompt}", bot.name))
    }

    async fn reset(&self, bot: &BotDescriptor) -> Result<(), DispatchError> {
        self.log.resets.lock().unwrap().push(bot.id.to_string());
        Ok(())
    }
}

/// Holds every call until a permit is added to `gate`, then replies `reply`.
pub struct GatedTransport {
    pub platform: Platform,
    pub gate: Arc<Semaphore>,
    pub reply: String,
}

impl GatedTransport {
    pub fn new(platform: Platform, reply: &str) -> Self {
        Self {
            platform,
            gate: Arc::new(Semaphore::new(0)),
            reply: reply.to_string(),
        }
    }
}

impl Transport for GatedTransport {
    fn name(&self) -> &str {
        "gated"
    }

    fn platform(&self) -> Platform {
        self.platform.clone()
    }

    async fn execute(&self, _bot: &BotDescriptor, _prompt: &str) -> Result<String, DispatchError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| DispatchError::transport(e.to_string()))?;
        permit.forget();
        Ok(self.reply.clone())
    }

    async fn reset(&self, _bot: &BotDescriptor) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Always fails with the configured error, for both execute and reset.
pub struct FailingTransport {
    pub platform: Platform,
    pub error: DispatchError,
}

impl Transport for FailingTransport {
    fn name(&self) -> &str {
        "failing"
    }

    fn platform(&self) -> Platform {
        self.platform.clone()
    }

    async fn execute(&self, _bot: &BotDescriptor, _prompt: &str) -> Result<String, DispatchError> {
        Err(self.error.clone())
    }

    async fn reset(&self, _bot: &BotDescriptor) -> Result<(), DispatchError> {
        Err(self.error.clone())
    }
}

pub fn completion_bot(id: &str, name: &str) -> BotDescriptor {
    BotDescriptor::new(id, name, Platform::CompletionApi)
}
