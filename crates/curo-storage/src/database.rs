// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use chrono::{DateTime, Utc};
use curo_core::CuroError;
use tokio_rusqlite::Connection;

/// Timestamps are stored as fixed-width UTC text so that SQL string
/// comparison agrees with chronological order.
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// The single database handle for the engine.
///
/// Wraps one `tokio_rusqlite::Connection`; every query module accepts
/// `&Database` and funnels through [`Database::connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode enabled and
    /// run all pending migrations.
    pub async fn open(path: &str) -> Result<Self, CuroError> {
        Self::open_with(path, true).await
    }

    /// Open with an explicit WAL-mode choice. Non-WAL mode exists for
    /// network filesystems where WAL is unsupported.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, CuroError> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(CuroError::storage)?;
                }
            }
        }

        let conn = Connection::open(path).await.map_err(CuroError::storage)?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            crate::migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        tracing::debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying connection handle.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the connection, flushing the WAL.
    pub async fn close(self) -> Result<(), CuroError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Helper to convert tokio_rusqlite errors into CuroError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CuroError {
    CuroError::storage(e)
}

/// Format a timestamp for storage.
pub(crate) fn format_ts(t: DateTime<Utc>) -> String {
    t.format(TS_FORMAT).to_string()
}

/// Parse a stored timestamp column, mapping failures to a rusqlite
/// conversion error so row mappers can use `?`.
pub(crate) fn ts_column(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
