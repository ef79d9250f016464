// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Curo patient engagement engine.
//!
//! This crate provides the foundational trait definitions, error types,
//! domain types, and the template renderer used throughout the Curo
//! workspace. The engine, storage, and channel crates all build on the
//! seams defined here.

pub mod error;
pub mod template;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CuroError;
pub use traits::{ChannelGateway, DeliveryLedger, TargetStore};
pub use types::{
    AnchorField, Appointment, ChannelKind, DeliveryLogEntry, DeliveryStatus, IdempotencyScope,
    OpenSlot, Outcome,
    RuleFamily, RunReport, Target, TargetKind, TriggerKind, WaitlistEntry, Window,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curo_error_variants_construct() {
        let _config = CuroError::Config("test".into());
        let _storage = CuroError::storage(std::io::Error::other("test"));
        let _channel = CuroError::Channel {
            message: "test".into(),
            source: None,
        };
        let _unavailable = CuroError::ChannelUnavailable {
            channel: "chat".into(),
        };
        let _rule = CuroError::RuleNotFound {
            family: "birthday".into(),
        };
        let _params = CuroError::InvalidParams("slot required".into());
        let _timeout = CuroError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = CuroError::Internal("test".into());
    }

    #[test]
    fn adapter_traits_are_object_safe() {
        // If any trait loses object safety this stops compiling.
        fn _gateway(_: &dyn ChannelGateway) {}
        fn _store(_: &dyn TargetStore) {}
        fn _ledger(_: &dyn DeliveryLedger) {}
    }

    #[test]
    fn channel_unavailable_message_names_channel() {
        let err = CuroError::ChannelUnavailable {
            channel: ChannelKind::Sms.to_string(),
        };
        assert_eq!(err.to_string(), "channel not configured: sms");
    }
}
