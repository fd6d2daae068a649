//! Dispatch gateway: routes a prompt to the transport for a bot's platform.
//!
//! Routing is a table lookup keyed on [`Platform`], so adding a platform
//! means registering one more transport. The gateway holds no state between
//! calls beyond that immutable table.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use botline_types::bot::{BotDescriptor, Platform};
use botline_types::error::DispatchError;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use super::box_transport::BoxTransport;
use super::transport::Transport;

/// Owned reply future returned by [`DispatchGateway::dispatch`].
pub type ReplyFuture = Pin<Box<dyn Future<Output = Result<String, DispatchError>> + Send + 'static>>;

/// Platform-keyed router over the registered transports.
pub struct DispatchGateway {
    transports: HashMap<Platform, Arc<BoxTransport>>,
}

impl DispatchGateway {
    pub fn builder() -> DispatchGatewayBuilder {
        DispatchGatewayBuilder::default()
    }

    /// Whether a transport is registered for `platform`.
    pub fn supports(&self, platform: &Platform) -> bool {
        self.transports.contains_key(platform)
    }

    /// Registered platforms, in no particular order.
    pub fn platforms(&self) -> Vec<&Platform> {
        self.transports.keys().collect()
    }

    /// Select the transport for `bot`.
    ///
    /// Fails with `UnsupportedPlatform` when nothing is registered for the
    /// bot's platform. Pure lookup, no I/O.
    pub fn route(&self, bot: &BotDescriptor) -> Result<&Arc<BoxTransport>, DispatchError> {
        self.transports
            .get(&bot.platform)
            .ok_or_else(|| DispatchError::UnsupportedPlatform(bot.platform.to_string()))
    }

    /// Route synchronously and return an owned future for the reply.
    ///
    /// The returned future resolves to `Err(Cancelled)` as soon as `cancel`
    /// fires, dropping the in-progress transport call. Routing errors are
    /// returned here, before the future exists.
    pub fn dispatch(
        &self,
        bot: &BotDescriptor,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<ReplyFuture, DispatchError> {
        let transport = Arc::clone(self.route(bot)?);
        let span = info_span!(
            "dispatch",
            bot.id = %bot.id,
            bot.platform = %bot.platform,
            transport = transport.name(),
        );

        let bot = bot.clone();
        let prompt = prompt.to_string();
        let cancel = cancel.clone();

        Ok(Box::pin(
            async move { run_cancellable(&transport, &bot, &prompt, &cancel).await }
                .instrument(span),
        ))
    }

    /// Send `prompt` to `bot` and wait for the reply.
    pub async fn execute(
        &self,
        bot: &BotDescriptor,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DispatchError> {
        self.dispatch(bot, prompt, cancel)?.await
    }

    /// Tell a stateful backend to drop its context for `bot`.
    ///
    /// Stateless transports treat this as a no-op. A platform without a
    /// registered transport has no backend context to drop, so it is also
    /// a no-op rather than an error.
    pub async fn reset_session(&self, bot: &BotDescriptor) -> Result<(), DispatchError> {
        let Some(transport) = self.transports.get(&bot.platform) else {
            debug!(bot_id = %bot.id, platform = %bot.platform, "no transport to reset");
            return Ok(());
        };

        transport.reset(bot).await.inspect_err(|err| {
            warn!(bot_id = %bot.id, error = %err, "session reset failed");
        })
    }
}

async fn run_cancellable(
    transport: &BoxTransport,
    bot: &BotDescriptor,
    prompt: &str,
    cancel: &CancellationToken,
) -> Result<String, DispatchError> {
    if cancel.is_cancelled() {
        debug!("cancelled before dispatch");
        return Err(DispatchError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("dispatch cancelled");
            Err(DispatchError::Cancelled)
        }
        result = transport.execute(bot, prompt) => {
            match &result {
                Ok(reply) => debug!(reply_len = reply.len(), "dispatch completed"),
                Err(err) => debug!(error = %err, "dispatch failed"),
            }
            result
        }
    }
}

/// Builder for [`DispatchGateway`].
#[derive(Default)]
pub struct DispatchGatewayBuilder {
    transports: HashMap<Platform, Arc<BoxTransport>>,
}

impl DispatchGatewayBuilder {
    /// Register a transport under its own platform.
    ///
    /// A transport already registered for the same platform is replaced.
    pub fn register<T: Transport + 'static>(self, transport: T) -> Self {
        self.register_boxed(BoxTransport::new(transport))
    }

    pub fn register_boxed(mut self, transport: BoxTransport) -> Self {
        let platform = transport.platform();
        if let Some(previous) = self.transports.insert(platform.clone(), Arc::new(transport)) {
            debug!(%platform, replaced = previous.name(), "replaced transport");
        }
        self
    }

    pub fn build(self) -> DispatchGateway {
        DispatchGateway {
            transports: self.transports,
        }
    }
}
