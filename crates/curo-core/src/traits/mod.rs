// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the engine's external seams.
//!
//! The engine consumes a target store (patient/lead/appointment records),
//! a delivery ledger (idempotency + audit), and one channel gateway per
//! configured channel. All three are trait objects so deployments can swap
//! the reference SQLite implementations for the clinic's own systems.

pub mod gateway;
pub mod ledger;
pub mod store;

pub use gateway::ChannelGateway;
pub use ledger::DeliveryLedger;
pub use store::TargetStore;
