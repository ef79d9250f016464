// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email gateway over an SMTP relay using lettre.

use async_trait::async_trait;
use curo_config::model::EmailChannelConfig;
use curo_core::{ChannelGateway, ChannelKind, CuroError};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

struct EmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    default_subject: String,
}

/// Gateway for the email channel.
pub struct EmailGateway {
    transport: Option<EmailTransport>,
}

impl EmailGateway {
    /// Build from config. Returns an unavailable gateway when the channel
    /// is disabled or the relay is not configured.
    pub fn from_config(config: &EmailChannelConfig) -> Result<Self, CuroError> {
        if !config.enabled {
            return Ok(Self { transport: None });
        }
        let (Some(smtp_host), Some(from_address)) = (&config.smtp_host, &config.from_address)
        else {
            return Ok(Self { transport: None });
        };

        let from: Mailbox = from_address
            .parse()
            .map_err(|e| CuroError::Config(format!("invalid email.from_address: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
            .map_err(|e| CuroError::Channel {
                message: format!("failed to build SMTP transport: {e}"),
                source: Some(Box::new(e)),
            })?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: Some(EmailTransport {
                mailer: builder.build(),
                from,
                default_subject: config.default_subject.clone(),
            }),
        })
    }

    async fn deliver(
        &self,
        contact: &str,
        subject: Option<&str>,
        text: &str,
    ) -> Result<bool, CuroError> {
        let Some(transport) = &self.transport else {
            return Err(CuroError::ChannelUnavailable {
                channel: ChannelKind::Email.to_string(),
            });
        };

        let to: Mailbox = contact.parse().map_err(|e| CuroError::Channel {
            message: format!("invalid recipient address `{contact}`: {e}"),
            source: None,
        })?;

        let message = Message::builder()
            .from(transport.from.clone())
            .to(to)
            .subject(subject.unwrap_or(&transport.default_subject))
            .body(text.to_string())
            .map_err(|e| CuroError::Channel {
                message: format!("failed to build email: {e}"),
                source: Some(Box::new(e)),
            })?;

        match transport.mailer.send(message).await {
            Ok(response) if response.is_positive() => {
                debug!("email accepted by relay");
                Ok(true)
            }
            Ok(response) => {
                warn!(code = %response.code(), "smtp relay rejected message");
                Ok(false)
            }
            Err(e) => Err(CuroError::Channel {
                message: format!("smtp send failed: {e}"),
                source: Some(Box::new(e)),
            }),
        }
    }
}

#[async_trait]
impl ChannelGateway for EmailGateway {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    async fn send(&self, contact: &str, text: &str) -> Result<bool, CuroError> {
        self.deliver(contact, None, text).await
    }

    async fn send_with_subject(
        &self,
        contact: &str,
        subject: Option<&str>,
        text: &str,
    ) -> Result<bool, CuroError> {
        self.deliver(contact, subject, text).await
    }
}
