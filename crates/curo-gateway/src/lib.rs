// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface for the Curo automation engine.
//!
//! A thin axum server exposing run triggers and pending counts to an
//! external scheduler or operator tool. All orchestration lives in
//! curo-engine; the gateway only translates HTTP to runner calls.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, ServerConfig, router, start_server};
