// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions over the database.
//!
//! Each function takes `&Database` and routes through the single writer.

pub mod ledger;
pub mod targets;

/// Parse a stored enum column via `FromStr`, mapping failures to a rusqlite
/// conversion error so row mappers can use `?`.
pub(crate) fn parse_col<T>(idx: usize, raw: &str) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
