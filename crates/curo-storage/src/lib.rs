// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Curo engagement engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, the delivery ledger that backs
//! at-most-once dispatch, and a reference target store for clinics without
//! an external record system.

pub mod database;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;
pub mod writer;

pub use database::Database;
pub use ledger::SqliteLedger;
pub use models::*;
pub use store::SqliteTargetStore;
