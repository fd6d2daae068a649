//! BoxTransport -- object-safe dynamic dispatch wrapper for Transport.
//!
//! 1. Define an object-safe `TransportDyn` trait with boxed futures
//! 2. Blanket-impl `TransportDyn` for all `T: Transport`
//! 3. `BoxTransport` wraps `Box<dyn TransportDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use botline_types::bot::{BotDescriptor, Platform};
use botline_types::error::DispatchError;

use super::transport::Transport;

/// Object-safe version of [`Transport`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn TransportDyn`).
/// A blanket implementation is provided for all types implementing `Transport`.
pub trait TransportDyn: Send + Sync {
    fn name(&self) -> &str;

    fn platform(&self) -> Platform;

    fn execute_boxed<'a>(
        &'a self,
        bot: &'a BotDescriptor,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, DispatchError>> + Send + 'a>>;

    fn reset_boxed<'a>(
        &'a self,
        bot: &'a BotDescriptor,
    ) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send + 'a>>;
}

impl<T: Transport> TransportDyn for T {
    fn name(&self) -> &str {
        Transport::name(self)
    }

    fn platform(&self) -> Platform {
        Transport::platform(self)
    }

    fn execute_boxed<'a>(
        &'a self,
        bot: &'a BotDescriptor,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, DispatchError>> + Send + 'a>> {
        Box::pin(self.execute(bot, prompt))
    }

    fn reset_boxed<'a>(
        &'a self,
        bot: &'a BotDescriptor,
    ) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send + 'a>> {
        Box::pin(self.reset(bot))
    }
}

/// Type-erased transport for runtime strategy selection.
///
/// Since `Transport` uses RPITIT, it cannot be used as a trait object directly.
/// `BoxTransport` provides equivalent methods that delegate to the inner
/// `TransportDyn` trait object.
pub struct BoxTransport {
    inner: Box<dyn TransportDyn + Send + Sync>,
}

impl BoxTransport {
    /// Wrap a concrete `Transport` in a type-erased box.
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            inner: Box::new(transport),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn platform(&self) -> Platform {
        self.inner.platform()
    }

    pub async fn execute(&self, bot: &BotDescriptor, prompt: &str) -> Result<String, DispatchError> {
        self.inner.execute_boxed(bot, prompt).await
    }

    pub async fn reset(&self, bot: &BotDescriptor) -> Result<(), DispatchError> {
        self.inner.reset_boxed(bot).await
    }
}
