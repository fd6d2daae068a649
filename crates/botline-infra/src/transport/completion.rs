//! CompletionTransport -- [`Transport`] for a REST chat-completion API.
//!
//! Sends the prompt as a single user message to `POST {endpoint}` with a
//! bearer key and reads the reply from `choices[0].message.content`. The
//! API is stateless, so `reset` has nothing to do.
//!
//! The default API key is wrapped in [`SecretString`] and only exposed when
//! building the `Authorization` header.

use botline_core::dispatch::transport::Transport;
use botline_types::bot::{BotDescriptor, Platform};
use botline_types::error::DispatchError;
use botline_types::message::NO_RESPONSE_PLACEHOLDER;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_reply(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string())
    }
}

/// Chat-completion transport.
///
/// Per-bot `endpoint`, `model` and `api_key` from
/// [`PlatformConfig`](botline_types::bot::PlatformConfig) override the
/// transport-wide defaults.
pub struct CompletionTransport {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl CompletionTransport {
    pub fn new(client: reqwest::Client, endpoint: String, model: String) -> Self {
        Self {
            client,
            endpoint,
            model,
            api_key: None,
        }
    }

    /// Key used for bots that do not carry their own.
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

impl Transport for CompletionTransport {
    fn name(&self) -> &str {
        "http_completion"
    }

    fn platform(&self) -> Platform {
        Platform::CompletionApi
    }

    async fn execute(&self, bot: &BotDescriptor, prompt: &str) -> Result<String, DispatchError> {
        let token = match (bot.config.api_key.as_deref(), &self.api_key) {
            (Some(key), _) => key,
            (None, Some(key)) => key.expose_secret(),
            (None, None) => {
                return Err(DispatchError::transport(format!(
                    "no API key configured for bot '{}'",
                    bot.id
                )));
            }
        };
        let endpoint = bot.config.endpoint.as_deref().unwrap_or(&self.endpoint);
        let body = ChatRequest {
            model: bot.config.model.as_deref().unwrap_or(&self.model),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Transport {
                status: Some(status.as_u16()),
                message: error_body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::transport(format!("failed to parse response: {e}")))?;

        Ok(parsed.into_reply())
    }

    async fn reset(&self, _bot: &BotDescriptor) -> Result<(), DispatchError> {
        Ok(())
    }
}
