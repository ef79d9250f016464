// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-writer contract for the delivery ledger.
//!
//! Every statement in this crate runs on the one background thread owned by
//! the `tokio_rusqlite::Connection` inside [`crate::Database`]. There is no
//! second connection and no pool, and there must never be one: the ledger's
//! insert-if-absent claim is only atomic because the existence check and the
//! insert execute as a single statement on a single thread.
//!
//! **Do NOT open additional connections to the database file.**

// Concretely:
// - query modules take `&Database` and go through `database.connection().call()`
// - tokio-rusqlite runs those closures sequentially, so SQLITE_BUSY cannot
//   occur between Curo's own writers
// - a second connection would reintroduce the claim race the ledger closes
