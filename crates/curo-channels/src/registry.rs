// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry mapping channel kinds to their configured gateways.

use std::collections::HashMap;
use std::sync::Arc;

use curo_config::model::ChannelsConfig;
use curo_core::{ChannelGateway, ChannelKind, CuroError};

use crate::{ChatGateway, EmailGateway, SmsGateway};

/// All channel gateways, keyed by kind.
///
/// Every kind is always present; unconfigured channels hold an unavailable
/// gateway so rule families fail with a clear "channel not configured"
/// report instead of a missing-key panic.
pub struct GatewayRegistry {
    gateways: HashMap<ChannelKind, Arc<dyn ChannelGateway>>,
}

impl GatewayRegistry {
    /// Build gateways for every channel from config.
    pub fn from_config(config: &ChannelsConfig) -> Result<Self, CuroError> {
        let mut gateways: HashMap<ChannelKind, Arc<dyn ChannelGateway>> = HashMap::new();
        gateways.insert(
            ChannelKind::Chat,
            Arc::new(ChatGateway::from_config(&config.chat)?),
        );
        gateways.insert(
            ChannelKind::Email,
            Arc::new(EmailGateway::from_config(&config.email)?),
        );
        gateways.insert(
            ChannelKind::Sms,
            Arc::new(SmsGateway::from_config(&config.sms)?),
        );
        Ok(Self { gateways })
    }

    /// Build from pre-constructed gateways. Test use.
    pub fn from_gateways(
        gateways: impl IntoIterator<Item = Arc<dyn ChannelGateway>>,
    ) -> Self {
        Self {
            gateways: gateways
                .into_iter()
                .map(|g| (g.channel(), g))
                .collect(),
        }
    }

    /// All registered gateways, for wiring into the runner.
    pub fn all(&self) -> Vec<Arc<dyn ChannelGateway>> {
        self.gateways.values().cloned().collect()
    }

    /// The gateway for `channel`, if registered.
    pub fn get(&self, channel: ChannelKind) -> Option<Arc<dyn ChannelGateway>> {
        self.gateways.get(&channel).cloned()
    }

    /// Whether the channel has a registered, available gateway.
    pub fn is_available(&self, channel: ChannelKind) -> bool {
        self.gateways
            .get(&channel)
            .is_some_and(|g| g.is_available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_registers_all_channels_unavailable() {
        let registry = GatewayRegistry::from_config(&ChannelsConfig::default()).unwrap();
        for channel in [ChannelKind::Chat, ChannelKind::Email, ChannelKind::Sms] {
            assert!(registry.get(channel).is_some());
            assert!(!registry.is_available(channel));
        }
    }

    #[test]
    fn configured_chat_channel_is_available() {
        let mut config = ChannelsConfig::default();
        config.chat.api_url = Some("https://chat.example/send".to_string());
        config.chat.api_token = Some("tok".to_string());
        let registry = GatewayRegistry::from_config(&config).unwrap();
        assert!(registry.is_available(ChannelKind::Chat));
        assert!(!registry.is_available(ChannelKind::Sms));
    }
}
