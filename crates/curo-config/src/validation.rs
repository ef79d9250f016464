// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as interval bounds and partially configured channels.

use crate::diagnostic::ConfigError;
use crate::model::CuroConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with all collected validation errors (does not fail fast).
pub fn validate_config(config: &CuroConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Interval of zero would hammer the shared gateway; anything above a
    // minute is almost certainly a unit mistake.
    if config.engine.min_send_interval_ms > 60_000 {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.min_send_interval_ms must be at most 60000, got {}",
                config.engine.min_send_interval_ms
            ),
        });
    }

    if config.engine.send_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.send_timeout_secs must be at least 1".to_string(),
        });
    }

    for (key, value) in [
        ("engine.lead_lookback_days", config.engine.lead_lookback_days),
        (
            "engine.inactive_lookback_days",
            config.engine.inactive_lookback_days,
        ),
        (
            "engine.no_show_lookback_hours",
            config.engine.no_show_lookback_hours,
        ),
        (
            "engine.recurring_scope_days",
            config.engine.recurring_scope_days,
        ),
    ] {
        if value <= 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be positive, got {value}"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    }

    // A half-configured channel is a misconfiguration, not a disabled one.
    let chat = &config.channels.chat;
    if chat.api_url.is_some() != chat.api_token.is_some() {
        errors.push(ConfigError::Validation {
            message: "channels.chat requires both api_url and api_token".to_string(),
        });
    }

    let email = &config.channels.email;
    if email.smtp_host.is_some() && email.from_address.is_none() {
        errors.push(ConfigError::Validation {
            message: "channels.email.from_address is required when smtp_host is set".to_string(),
        });
    }

    let sms = &config.channels.sms;
    if sms.api_url.is_some() != sms.api_token.is_some() {
        errors.push(ConfigError::Validation {
            message: "channels.sms requires both api_url and api_token".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = CuroConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn oversized_interval_fails_validation() {
        let mut config = CuroConfig::default();
        config.engine.min_send_interval_ms = 120_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("min_send_interval_ms"))
        ));
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CuroConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn chat_url_without_token_fails_validation() {
        let mut config = CuroConfig::default();
        config.channels.chat.api_url = Some("https://chat.example/send".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("channels.chat"))
        ));
    }

    #[test]
    fn email_host_without_from_address_fails_validation() {
        let mut config = CuroConfig::default();
        config.channels.email.smtp_host = Some("smtp.example".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("from_address"))
        ));
    }

    #[test]
    fn negative_lookback_fails_validation() {
        let mut config = CuroConfig::default();
        config.engine.lead_lookback_days = -1;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("lead_lookback_days"))
        ));
    }

    #[test]
    fn fully_configured_channels_pass() {
        let mut config = CuroConfig::default();
        config.channels.chat.api_url = Some("https://chat.example/send".to_string());
        config.channels.chat.api_token = Some("tok".to_string());
        config.channels.email.smtp_host = Some("smtp.example".to_string());
        config.channels.email.from_address = Some("clinic@example.com".to_string());
        config.channels.sms.api_url = Some("https://sms.example/send".to_string());
        config.channels.sms.api_token = Some("tok".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
