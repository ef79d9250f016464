// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./curo.toml` > `~/.config/curo/curo.toml` >
//! `/etc/curo/curo.toml` with environment variable overrides via the
//! `CURO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CuroConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/curo/curo.toml` (system-wide)
/// 3. `~/.config/curo/curo.toml` (user XDG config)
/// 4. `./curo.toml` (local directory)
/// 5. `CURO_*` environment variables
pub fn load_config() -> Result<CuroConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CuroConfig::default()))
        .merge(Toml::file("/etc/curo/curo.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("curo/curo.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("curo.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and for callers that already hold the config text.
pub fn load_config_from_str(toml_content: &str) -> Result<CuroConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CuroConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CuroConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CuroConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CURO_SMS_API_TOKEN` must map to
/// `channels.sms.api_token`, not `channels.sms.api.token`.
fn env_provider() -> Env {
    Env::prefixed("CURO_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: CURO_CHAT_API_TOKEN -> "chat_api_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("chat_", "channels.chat.", 1)
            .replacen("email_", "channels.email.", 1)
            .replacen("sms_", "channels.sms.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_file() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.engine.min_send_interval_ms, 1500);
        assert!(!config.engine.retry_failed);
        assert_eq!(config.gateway.port, 8632);
    }

    #[test]
    fn programmatic_defaults_match_deserialized_defaults() {
        let loaded = load_config_from_str("").unwrap();
        let built = CuroConfig::default();

        // Channels are enabled-by-default either way; availability is
        // decided by credentials, not the enabled flag.
        assert!(built.channels.chat.enabled);
        assert_eq!(loaded.channels.chat.enabled, built.channels.chat.enabled);
        assert_eq!(loaded.channels.email.enabled, built.channels.email.enabled);
        assert_eq!(loaded.channels.sms.enabled, built.channels.sms.enabled);
        assert_eq!(loaded.channels.email.smtp_port, built.channels.email.smtp_port);
        assert_eq!(
            loaded.channels.email.default_subject,
            built.channels.email.default_subject
        );
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[engine]
min_send_interval_ms = 2000
retry_failed = true

[channels.chat]
api_url = "https://chat.example/send"
api_token = "tok"
"#,
        )
        .unwrap();
        assert_eq!(config.engine.min_send_interval_ms, 2000);
        assert!(config.engine.retry_failed);
        assert_eq!(
            config.channels.chat.api_url.as_deref(),
            Some("https://chat.example/send")
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
[engine]
min_send_intervall_ms = 2000
"#,
        );
        assert!(result.is_err());
    }
}
