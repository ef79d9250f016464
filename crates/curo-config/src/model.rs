// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Curo engagement engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized config
//! keys are rejected at startup with actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Curo configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CuroConfig {
    /// Engine pacing, retry policy, and lookback windows.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound channel gateway settings.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Engine pacing and rule-window configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Minimum delay between consecutive sends within one batch, in
    /// milliseconds. Exists to respect the shared gateway's throughput
    /// ceiling; sends within a run are sequential.
    #[serde(default = "default_min_send_interval_ms")]
    pub min_send_interval_ms: u64,

    /// Per-message send timeout in seconds. A timed-out send counts as
    /// failed for that target only.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Retry policy for the ledger exclusion predicate.
    ///
    /// `false` preserves the historical behavior: any logged attempt
    /// (sent or failed) permanently blocks re-delivery. `true` lets
    /// failed attempts be retried on a later run.
    #[serde(default)]
    pub retry_failed: bool,

    /// How far back lead creation is scanned for drip candidates, in days.
    #[serde(default = "default_lead_lookback_days")]
    pub lead_lookback_days: i64,

    /// How far back patient inactivity is scanned, in days.
    #[serde(default = "default_inactive_lookback_days")]
    pub inactive_lookback_days: i64,

    /// How far past the no-show threshold appointments are scanned, in hours.
    #[serde(default = "default_no_show_lookback_hours")]
    pub no_show_lookback_hours: i64,

    /// Idempotency window for recurring rules (reactivation), in days.
    #[serde(default = "default_recurring_scope_days")]
    pub recurring_scope_days: i64,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_send_interval_ms: default_min_send_interval_ms(),
            send_timeout_secs: default_send_timeout_secs(),
            retry_failed: false,
            lead_lookback_days: default_lead_lookback_days(),
            inactive_lookback_days: default_inactive_lookback_days(),
            no_show_lookback_hours: default_no_show_lookback_hours(),
            recurring_scope_days: default_recurring_scope_days(),
            log_level: default_log_level(),
        }
    }
}

fn default_min_send_interval_ms() -> u64 {
    1500
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_lead_lookback_days() -> i64 {
    90
}

fn default_inactive_lookback_days() -> i64 {
    180
}

fn default_no_show_lookback_hours() -> i64 {
    24
}

fn default_recurring_scope_days() -> i64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("curo").join("curo.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("curo.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Outbound channel gateway configuration, one section per transport.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelsConfig {
    /// Chat gateway (WhatsApp-style HTTP API) settings.
    #[serde(default)]
    pub chat: ChatChannelConfig,

    /// SMTP email settings.
    #[serde(default)]
    pub email: EmailChannelConfig,

    /// SMS provider settings.
    #[serde(default)]
    pub sms: SmsChannelConfig,
}

/// Chat gateway configuration. The gateway is unavailable until both the
/// API URL and token are set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatChannelConfig {
    /// Base URL of the chat gateway's send endpoint.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Bearer token for the chat gateway API.
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_channel_enabled")]
    pub enabled: bool,
}

impl Default for ChatChannelConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            enabled: default_channel_enabled(),
        }
    }
}

/// SMTP email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailChannelConfig {
    /// SMTP relay hostname. `None` disables the email channel.
    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// From address for outbound mail.
    #[serde(default)]
    pub from_address: Option<String>,

    /// Subject line used when a rule or step supplies none.
    #[serde(default = "default_email_subject")]
    pub default_subject: String,

    #[serde(default = "default_channel_enabled")]
    pub enabled: bool,
}

impl Default for EmailChannelConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: None,
            default_subject: default_email_subject(),
            enabled: default_channel_enabled(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_email_subject() -> String {
    "Mensagem da clínica".to_string()
}

/// SMS provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsChannelConfig {
    /// Base URL of the SMS provider's send endpoint.
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub api_token: Option<String>,

    /// Sender id displayed to recipients.
    #[serde(default)]
    pub sender_id: Option<String>,

    #[serde(default = "default_channel_enabled")]
    pub enabled: bool,
}

impl Default for SmsChannelConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            sender_id: None,
            enabled: default_channel_enabled(),
        }
    }
}

fn default_channel_enabled() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/v1/*` routes. `None` rejects all
    /// authenticated routes (fail-closed).
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8632
}
