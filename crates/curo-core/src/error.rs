// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Curo engagement engine.

use thiserror::Error;

/// The primary error type used across Curo adapter traits and engine operations.
///
/// Only whole-run failures surface as `CuroError`. Per-target problems
/// (missing contact, transport rejection) are outcomes recorded in the run
/// report, never errors.
#[derive(Debug, Error)]
pub enum CuroError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel gateway errors surfaced by adapter plumbing (not per-send
    /// transport rejections, which fold into the run report).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The rule family's configured channel has no usable gateway.
    #[error("channel not configured: {channel}")]
    ChannelUnavailable { channel: String },

    /// A run was asked for a rule family with no active rule.
    #[error("no active rule for family: {family}")]
    RuleNotFound { family: String },

    /// Required run parameter is missing or out of range.
    #[error("invalid run parameter: {0}")]
    InvalidParams(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CuroError {
    /// Wrap any storage-layer error source.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CuroError::Storage {
            source: Box::new(source),
        }
    }
}
