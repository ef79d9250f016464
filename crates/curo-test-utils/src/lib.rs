// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Curo workspace.
//!
//! Provides a mock channel gateway with failure injection, an in-memory
//! target store, an in-memory delivery ledger, and fixture builders. Used
//! by engine unit tests and workspace integration tests.

pub mod fixtures;
pub mod memory_ledger;
pub mod memory_store;
pub mod mock_gateway;

pub use memory_ledger::MemoryLedger;
pub use memory_store::{MemoryStore, MemoryTarget};
pub use mock_gateway::{MockGateway, SentMessage};
