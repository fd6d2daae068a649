//! Content channel: [`Transport`] for a web chat driven from inside a page.
//!
//! The host owns the other end of an mpsc channel (the "endpoint"), which
//! forwards each [`ChannelMessage::Prompt`] to the embedded chat and answers
//! through the attached oneshot responder. The web chat keeps its own
//! conversation state, so `reset` is forwarded as [`ChannelMessage::Reset`].
//!
//! If the caller drops an in-progress `execute` (cancellation), the endpoint
//! receives [`ChannelMessage::Abort`] for that request.

use botline_core::dispatch::transport::Transport;
use botline_types::bot::{BotDescriptor, BotId, Platform};
use botline_types::error::DispatchError;
use botline_types::message::NO_RESPONSE_PLACEHOLDER;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

/// Message from the transport to the page endpoint.
#[derive(Debug)]
pub enum ChannelMessage {
    /// Send `prompt` to the web chat and answer through `reply`.
    Prompt {
        request_id: Uuid,
        bot_id: BotId,
        prompt: String,
        reply: oneshot::Sender<ChannelReply>,
    },
    /// The caller gave up on `request_id`; stop generating if possible.
    Abort { request_id: Uuid },
    /// Start a fresh conversation for `bot_id`.
    Reset { bot_id: BotId },
}

/// Endpoint answer to a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelReply {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChannelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            text: None,
            error: Some(error.into()),
        }
    }

    fn into_result(self) -> Result<String, DispatchError> {
        match self {
            ChannelReply { error: Some(error), .. } => Err(DispatchError::transport(error)),
            ChannelReply { text: Some(text), .. } => Ok(text),
            ChannelReply { text: None, .. } => Ok(NO_RESPONSE_PLACEHOLDER.to_string()),
        }
    }
}

/// Web-chat transport over a bounded mpsc channel.
#[derive(Clone)]
pub struct ContentChannelTransport {
    tx: mpsc::Sender<ChannelMessage>,
}

impl ContentChannelTransport {
    /// Create the transport and the receiver the page endpoint listens on.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ChannelMessage>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    fn closed() -> DispatchError {
        DispatchError::transport("content channel closed")
    }
}

/// Sends `Abort` when dropped while still armed.
struct AbortOnDrop {
    tx: mpsc::Sender<ChannelMessage>,
    request_id: Uuid,
    armed: bool,
}

impl AbortOnDrop {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let request_id = self.request_id;
        match self.tx.try_send(ChannelMessage::Abort { request_id }) {
            Ok(()) => debug!(%request_id, "sent abort to content channel"),
            Err(err) => warn!(%request_id, error = %err, "failed to send abort to content channel"),
        }
    }
}

impl Transport for ContentChannelTransport {
    fn name(&self) -> &str {
        "content_channel"
    }

    fn platform(&self) -> Platform {
        Platform::WebChat
    }

    async fn execute(&self, bot: &BotDescriptor, prompt: &str) -> Result<String, DispatchError> {
        let request_id = Uuid::now_v7();
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(ChannelMessage::Prompt {
                request_id,
                bot_id: bot.id.clone(),
                prompt: prompt.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| Self::closed())?;

        let guard = AbortOnDrop {
            tx: self.tx.clone(),
            request_id,
            armed: true,
        };
        let reply = reply_rx
            .await
            .map_err(|_| DispatchError::transport("content channel dropped the request"));
        guard.disarm();

        reply?.into_result()
    }

    async fn reset(&self, bot: &BotDescriptor) -> Result<(), DispatchError> {
        self.tx
            .send(ChannelMessage::Reset {
                bot_id: bot.id.clone(),
            })
            .await
            .map_err(|_| Self::closed())
    }
}
