// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery ledger trait: the idempotency guard and audit trail.
//!
//! Two representations back this trait: ledger rows (the default, used by
//! drip steps and recurring rules) and per-appointment boolean flags (used
//! by single-shot appointment reminders). Rule families stay agnostic to
//! which one backs their target entity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CuroError;
use crate::types::{DeliveryLogEntry, DeliveryStatus, IdempotencyScope, TargetKind};

/// Append-only store of delivery attempts.
///
/// `begin_attempt` is the race guard: it must perform the existence check
/// and the claim as one atomic operation so two overlapping runs can never
/// both pass a "not yet notified" check. A claim that is never finished
/// still blocks future sends, matching the at-most-once invariant.
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    /// Whether a blocking attempt already exists for (subject, target)
    /// within `scope`. This is the eligibility resolver's exclusion
    /// predicate; it takes no lock and is advisory only.
    async fn already_notified(
        &self,
        subject_id: &str,
        target_id: &str,
        scope: IdempotencyScope,
        now: DateTime<Utc>,
    ) -> Result<bool, CuroError>;

    /// Atomically claim the right to deliver to (subject, target) within
    /// `scope`. Returns `true` if the claim succeeded and the caller must
    /// dispatch and then call `finish_attempt`; `false` if a blocking
    /// attempt already exists.
    async fn begin_attempt(
        &self,
        subject_id: &str,
        target_kind: TargetKind,
        target_id: &str,
        scope: IdempotencyScope,
        now: DateTime<Utc>,
    ) -> Result<bool, CuroError>;

    /// Record the terminal status of a claimed attempt.
    async fn finish_attempt(
        &self,
        subject_id: &str,
        target_id: &str,
        status: DeliveryStatus,
        error_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), CuroError>;

    /// Most recent attempts for a target, newest first. Audit use only.
    async fn recent_for_target(
        &self,
        target_id: &str,
        limit: u32,
    ) -> Result<Vec<DeliveryLogEntry>, CuroError>;
}
