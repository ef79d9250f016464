// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat gateway over a WhatsApp-style HTTP send API.
//!
//! POSTs `{"phone": ..., "message": ...}` to the configured endpoint with
//! bearer authentication. A non-2xx response or a `"success": false` body
//! is a per-message rejection, not an error.

use std::time::Duration;

use async_trait::async_trait;
use curo_config::model::ChatChannelConfig;
use curo_core::{ChannelGateway, ChannelKind, CuroError};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Serialize)]
struct ChatSendRequest<'a> {
    phone: &'a str,
    message: &'a str,
}

struct ChatTransport {
    client: reqwest::Client,
    api_url: String,
}

/// Gateway for the chat channel.
pub struct ChatGateway {
    transport: Option<ChatTransport>,
}

impl ChatGateway {
    /// Build from config. Returns an unavailable gateway when the channel
    /// is disabled or credentials are missing.
    pub fn from_config(config: &ChatChannelConfig) -> Result<Self, CuroError> {
        if !config.enabled {
            return Ok(Self { transport: None });
        }
        let (Some(api_url), Some(api_token)) = (&config.api_url, &config.api_token) else {
            return Ok(Self { transport: None });
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {api_token}"))
                .map_err(|e| CuroError::Config(format!("invalid chat api token: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CuroError::Channel {
                message: format!("failed to build chat HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            transport: Some(ChatTransport {
                client,
                api_url: api_url.clone(),
            }),
        })
    }
}

#[async_trait]
impl ChannelGateway for ChatGateway {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    async fn send(&self, contact: &str, text: &str) -> Result<bool, CuroError> {
        let Some(transport) = &self.transport else {
            return Err(CuroError::ChannelUnavailable {
                channel: ChannelKind::Chat.to_string(),
            });
        };

        let response = transport
            .client
            .post(&transport.api_url)
            .json(&ChatSendRequest {
                phone: contact,
                message: text,
            })
            .send()
            .await
            .map_err(|e| CuroError::Channel {
                message: format!("chat request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "chat gateway rejected message");
            return Ok(false);
        }

        // Some gateways report delivery failure inside a 200 body.
        if let Ok(body) = response.json::<serde_json::Value>().await {
            if body.get("success").and_then(|v| v.as_bool()) == Some(false) {
                warn!("chat gateway reported success=false");
                return Ok(false);
            }
        }

        debug!("chat message accepted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_channel_is_unavailable() {
        let config = ChatChannelConfig {
            api_url: Some("https://chat.example/send".to_string()),
            api_token: Some("tok".to_string()),
            enabled: false,
        };
        let gateway = ChatGateway::from_config(&config).unwrap();
        assert!(!gateway.is_available());
    }

    #[test]
    fn missing_credentials_are_unavailable_not_an_error() {
        let gateway = ChatGateway::from_config(&ChatChannelConfig::default()).unwrap();
        assert!(!gateway.is_available());
        assert_eq!(gateway.channel(), ChannelKind::Chat);
    }

    #[test]
    fn configured_channel_is_available() {
        let config = ChatChannelConfig {
            api_url: Some("https://chat.example/send".to_string()),
            api_token: Some("tok".to_string()),
            enabled: true,
        };
        let gateway = ChatGateway::from_config(&config).unwrap();
        assert!(gateway.is_available());
    }

    #[tokio::test]
    async fn send_on_unavailable_gateway_errors() {
        let gateway = ChatGateway::from_config(&ChatChannelConfig::default()).unwrap();
        let err = gateway.send("11999990000", "hi").await.unwrap_err();
        assert!(matches!(err, CuroError::ChannelUnavailable { .. }));
    }
}
