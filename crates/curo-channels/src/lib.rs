// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound channel gateways for the Curo engagement engine.
//!
//! Each gateway wraps one transport (chat HTTP API, SMTP relay, SMS
//! provider) behind [`curo_core::ChannelGateway`]. A gateway is always
//! constructible from config; missing credentials make it unavailable
//! rather than failing construction, so a partially configured deployment
//! still runs the rule families whose channels are set up.

pub mod chat;
pub mod email;
pub mod registry;
pub mod sms;

pub use chat::ChatGateway;
pub use email::EmailGateway;
pub use registry::GatewayRegistry;
pub use sms::SmsGateway;
