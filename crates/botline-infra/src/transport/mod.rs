//! Backend transports and the gateway factory.
//!
//! Each transport implements [`Transport`](botline_core::dispatch::transport::Transport)
//! for one [`Platform`](botline_types::bot::Platform). [`build_gateway`] wires
//! them into a [`DispatchGateway`] from a [`BotlineConfig`].

pub mod completion;
pub mod content_channel;
pub mod search_chat;

use std::time::Duration;

use botline_core::dispatch::gateway::DispatchGateway;
use botline_types::config::{BotlineConfig, HttpConfig};
use thiserror::Error;
use tracing::info;

use self::completion::CompletionTransport;
use self::content_channel::ContentChannelTransport;
use self::search_chat::SearchChatTransport;

/// Errors from assembling the gateway.
#[derive(Debug, Error)]
pub enum GatewayBuildError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Shared HTTP client for the REST transports.
pub fn http_client(config: &HttpConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
}

/// Build a gateway with the completion and search-chat transports, plus the
/// content-channel transport when the host supplies one.
///
/// Without a channel, web-chat bots fail at dispatch time with
/// `UnsupportedPlatform`.
pub fn build_gateway(
    config: &BotlineConfig,
    channel: Option<ContentChannelTransport>,
) -> Result<DispatchGateway, GatewayBuildError> {
    let client = http_client(&config.http)?;

    let mut builder = DispatchGateway::builder()
        .register(CompletionTransport::new(
            client.clone(),
            config.http.completion_endpoint.clone(),
            config.http.completion_model.clone(),
        ))
        .register(SearchChatTransport::new(client, config.http.search_endpoint.clone()));

    if let Some(channel) = channel {
        builder = builder.register(channel);
    }

    let gateway = builder.build();
    info!(platforms = gateway.platforms().len(), "dispatch gateway ready");
    Ok(gateway)
}
