// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS gateway over a generic provider HTTP send API.

use std::time::Duration;

use async_trait::async_trait;
use curo_config::model::SmsChannelConfig;
use curo_core::{ChannelGateway, ChannelKind, CuroError};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Serialize)]
struct SmsSendRequest<'a> {
    to: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
}

struct SmsTransport {
    client: reqwest::Client,
    api_url: String,
    sender_id: Option<String>,
}

/// Gateway for the SMS channel.
pub struct SmsGateway {
    transport: Option<SmsTransport>,
}

impl SmsGateway {
    /// Build from config. Returns an unavailable gateway when the channel
    /// is disabled or credentials are missing.
    pub fn from_config(config: &SmsChannelConfig) -> Result<Self, CuroError> {
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
                .map_err(|e| CuroError::Config(format!("invalid sms api token: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CuroError::Channel {
                message: format!("failed to build sms HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            transport: Some(SmsTransport {
                client,
                api_url: api_url.clone(),
                sender_id: config.sender_id.clone(),
            }),
        })
    }
}

#[async_trait]
impl ChannelGateway for SmsGateway {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    async fn send(&self, contact: &str, text: &str) -> Result<bool, CuroError> {
        let Some(transport) = &self.transport else {
            return Err(CuroError::ChannelUnavailable {
                channel: ChannelKind::Sms.to_string(),
            });
        };

        let response = transport
            .client
            .post(&transport.api_url)
            .json(&SmsSendRequest {
                to: contact,
                message: text,
                from: transport.sender_id.as_deref(),
            })
            .send()
            .await
            .map_err(|e| CuroError::Channel {
                message: format!("sms request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "sms provider rejected message");
            return Ok(false);
        }

        debug!("sms message accepted");
        Ok(true)
    }
}
