//! Transport trait definition.
//!
//! This is the capability interface every backend strategy implements:
//! send a prompt and obtain the reply, and drop backend-side context.

use botline_types::bot::{BotDescriptor, Platform};
use botline_types::error::DispatchError;

/// Trait for bot backend transports (HTTP completion, content channel, search chat).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Cancellation
/// is handled by the gateway, which drops the `execute` future when the
/// token fires; implementations only need to be cancel-safe on drop.
///
/// Implementations live in botline-infra.
pub trait Transport: Send + Sync {
    /// Human-readable transport name (e.g., "http_completion", "search_chat").
    fn name(&self) -> &str;

    /// The platform this transport serves.
    fn platform(&self) -> Platform;

    /// Send `prompt` to the bot's backend and return the reply text.
    ///
    /// A backend response without content yields the placeholder reply,
    /// not an error.
    fn execute(
        &self,
        bot: &BotDescriptor,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, DispatchError>> + Send;

    /// Ask the backend to drop any conversation context it keeps for `bot`.
    ///
    /// Stateless backends return `Ok(())` without doing anything.
    fn reset(
        &self,
        bot: &BotDescriptor,
    ) -> impl std::future::Future<Output = Result<(), DispatchError>> + Send;
}
