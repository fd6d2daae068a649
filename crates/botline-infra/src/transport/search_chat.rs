//! Search-chat transport: `POST {endpoint}` with `{"prompt": ...}`, reply at
//! `answer`.

use botline_core::dispatch::transport::Transport;
use botline_types::bot::{BotDescriptor, Platform};
use botline_types::error::DispatchError;
use botline_types::message::NO_RESPONSE_PLACEHOLDER;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    answer: Option<String>,
}

pub struct SearchChatTransport {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl SearchChatTransport {
    /// `endpoint` is used for bots whose config does not name one.
    pub fn new(client: reqwest::Client, endpoint: Option<String>) -> Self {
        Self { client, endpoint }
    }
}

impl Transport for SearchChatTransport {
    fn name(&self) -> &str {
        "search_chat"
    }

    fn platform(&self) -> Platform {
        Platform::SearchChat
    }

    async fn execute(&self, bot: &BotDescriptor, prompt: &str) -> Result<String, DispatchError> {
        let endpoint = bot
            .config
            .endpoint
            .as_deref()
            .or(self.endpoint.as_deref())
            .ok_or_else(|| {
                DispatchError::transport(format!("no search endpoint configured for bot '{}'", bot.id))
            })?;

        let mut request = self.client.post(endpoint).json(&SearchRequest { prompt });
        if let Some(key) = bot.config.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| DispatchError::Transport {
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

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::transport(format!("failed to parse response: {e}")))?;

        Ok(parsed
            .answer
            .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string()))
    }

    async fn reset(&self, _bot: &BotDescriptor) -> Result<(), DispatchError> {
        Ok(())
    }
}
