// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row models owned by the reference store.
//!
//! [`curo_core::Target`] is a rule-facing projection with a single `anchor`
//! timestamp; the table behind it keeps both timestamps. `TargetRecord` is
//! the full row used when seeding or importing records.

use chrono::{DateTime, Utc};
use curo_core::TargetKind;
use serde::{Deserialize, Serialize};

/// A full patient or lead row in the reference store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: String,
    pub kind: TargetKind,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
    /// Birth (month, day). Year is never stored.
    pub birth_month_day: Option<(u32, u32)>,
}
