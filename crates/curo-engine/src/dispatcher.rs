// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-limited channel dispatcher.
//!
//! Sends are sequential within a run: the inter-send delay exists to
//! respect the shared gateway's throughput ceiling, so the dispatcher
//! never interleaves sends. A transport failure is an outcome, not an
//! error; the dispatcher is total once a channel is available.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use curo_config::model::EngineConfig;
use curo_core::{ChannelGateway, ChannelKind};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Normalize a contact for its channel: phone-based channels get digits
/// only, address-based channels get trimmed as-is.
pub fn normalize_contact(channel: ChannelKind, raw: &str) -> String {
    if channel.is_phone_based() {
        raw.chars().filter(|c| c.is_ascii_digit()).collect()
    } else {
        raw.trim().to_string()
    }
}

/// Terminal outcome of one dispatch. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Rejected(String),
}

/// Sequential, paced sender over the configured gateways.
pub struct Dispatcher {
    gateways: HashMap<ChannelKind, Arc<dyn ChannelGateway>>,
    min_interval: Duration,
    send_timeout: Duration,
    last_send: Option<Instant>,
}

impl Dispatcher {
    pub fn new(
        gateways: impl IntoIterator<Item = Arc<dyn ChannelGateway>>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            gateways: gateways.into_iter().map(|g| (g.channel(), g)).collect(),
            min_interval: Duration::from_millis(config.min_send_interval_ms),
            send_timeout: Duration::from_secs(config.send_timeout_secs),
            last_send: None,
        }
    }

    /// Whether `channel` has an available gateway.
    pub fn is_available(&self, channel: ChannelKind) -> bool {
        self.gateways
            .get(&channel)
            .is_some_and(|g| g.is_available())
    }

    /// Deliver one message, pacing against the previous send.
    ///
    /// The contact is normalized here; callers pass it as stored. Timeouts
    /// and transport errors fold into [`SendOutcome::Rejected`].
    pub async fn dispatch(
        &mut self,
        channel: ChannelKind,
        contact: &str,
        subject: Option<&str>,
        text: &str,
    ) -> SendOutcome {
        let Some(gateway) = self.gateways.get(&channel) else {
            return SendOutcome::Rejected(format!("channel not configured: {channel}"));
        };
        if !gateway.is_available() {
            return SendOutcome::Rejected(format!("channel not configured: {channel}"));
        }

        if let Some(previous) = self.last_send {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_send = Some(Instant::now());

        let contact = normalize_contact(channel, contact);
        let send = gateway.send_with_subject(&contact, subject, text);
        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(true)) => {
                debug!(%channel, contact = %contact, "message delivered");
                SendOutcome::Delivered
            }
            Ok(Ok(false)) => {
                warn!(%channel, contact = %contact, "gateway rejected message");
                SendOutcome::Rejected("gateway rejected message".to_string())
            }
            Ok(Err(e)) => {
                warn!(%channel, contact = %contact, error = %e, "send failed");
                SendOutcome::Rejected(e.to_string())
            }
            Err(_) => {
                warn!(%channel, contact = %contact, "send timed out");
                SendOutcome::Rejected(format!(
                    "send timed out after {}s",
                    self.send_timeout.as_secs()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use curo_core::CuroError;
    use curo_test_utils::MockGateway;

    fn config(interval_ms: u64, timeout_secs: u64) -> EngineConfig {
        EngineConfig {
            min_send_interval_ms: interval_ms,
            send_timeout_secs: timeout_secs,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn normalize_strips_non_digits_for_phone_channels() {
        assert_eq!(
            normalize_contact(ChannelKind::Chat, "+55 (11) 99999-0000"),
            "5511999990000"
        );
        assert_eq!(normalize_contact(ChannelKind::Sms, "11 9.9999-0000"), "11999990000");
        assert_eq!(
            normalize_contact(ChannelKind::Email, " ana@example.com "),
            "ana@example.com"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_spaces_consecutive_sends() {
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        let mut dispatcher = Dispatcher::new(
            [gateway.clone() as Arc<dyn ChannelGateway>],
            &config(2000, 30),
        );

        let started = Instant::now();
        for contact in ["1", "2", "3"] {
            let outcome = dispatcher
                .dispatch(ChannelKind::Chat, contact, None, "hi")
                .await;
            assert_eq!(outcome, SendOutcome::Delivered);
        }

        // 3 recipients with a 2000 ms delay: >= 4000 ms first-to-last.
        assert!(started.elapsed() >= Duration::from_millis(4000));
        assert_eq!(gateway.sent_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_send_is_not_delayed() {
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        let mut dispatcher = Dispatcher::new(
            [gateway as Arc<dyn ChannelGateway>],
            &config(2000, 30),
        );

        let started = Instant::now();
        dispatcher.dispatch(ChannelKind::Chat, "1", None, "hi").await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    struct StuckGateway;

    #[async_trait]
    impl ChannelGateway for StuckGateway {
        fn channel(&self) -> ChannelKind {
            ChannelKind::Sms
        }
        fn is_available(&self) -> bool {
            true
        }
        async fn send(&self, _contact: &str, _text: &str) -> Result<bool, CuroError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_send_folds_into_rejection() {
        let mut dispatcher = Dispatcher::new(
            [Arc::new(StuckGateway) as Arc<dyn ChannelGateway>],
            &config(0, 5),
        );
        let outcome = dispatcher.dispatch(ChannelKind::Sms, "1", None, "hi").await;
        assert!(matches!(outcome, SendOutcome::Rejected(reason) if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn unavailable_channel_is_rejected_without_sending() {
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        gateway.set_available(false);
        let mut dispatcher = Dispatcher::new(
            [gateway.clone() as Arc<dyn ChannelGateway>],
            &config(0, 30),
        );

        let outcome = dispatcher.dispatch(ChannelKind::Chat, "1", None, "hi").await;
        assert!(matches!(outcome, SendOutcome::Rejected(reason) if reason.contains("not configured")));
        assert_eq!(gateway.sent_count().await, 0);
    }

    #[tokio::test]
    async fn missing_gateway_is_rejected() {
        let mut dispatcher = Dispatcher::new([], &config(0, 30));
        let outcome = dispatcher.dispatch(ChannelKind::Email, "a@b.c", None, "hi").await;
        assert!(matches!(outcome, SendOutcome::Rejected(_)));
    }
}
