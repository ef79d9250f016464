// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boolean-flag idempotency backend.
//!
//! Single-shot appointment reminders carry their idempotency state as a
//! per-appointment flag instead of ledger rows. `FlagLedger` adapts that
//! representation to the [`DeliveryLedger`] contract so the reminder
//! family stays agnostic to which backend guards it. The `target_id`
//! passed to this ledger is the appointment id, not the patient id.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curo_core::traits::{DeliveryLedger, TargetStore};
use curo_core::types::{DeliveryLogEntry, DeliveryStatus, IdempotencyScope};
use curo_core::{CuroError, TargetKind};

/// Flag-backed delivery ledger over the target store.
pub struct FlagLedger {
    store: Arc<dyn TargetStore>,
}

impl FlagLedger {
    pub fn new(store: Arc<dyn TargetStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DeliveryLedger for FlagLedger {
    /// The advisory check is answered upstream: resolvers read the flag
    /// off the appointment projection itself, so nothing is pending here.
    async fn already_notified(
        &self,
        _subject_id: &str,
        _target_id: &str,
        _scope: IdempotencyScope,
        _now: DateTime<Utc>,
    ) -> Result<bool, CuroError> {
        Ok(false)
    }

    async fn begin_attempt(
        &self,
        _subject_id: &str,
        _target_kind: TargetKind,
        target_id: &str,
        _scope: IdempotencyScope,
        _now: DateTime<Utc>,
    ) -> Result<bool, CuroError> {
        self.store.claim_reminder_flag(target_id).await
    }

    /// The flag set in `begin_attempt` is the entire record.
    async fn finish_attempt(
        &self,
        _subject_id: &str,
        _target_id: &str,
        _status: DeliveryStatus,
        _error_message: Option<&str>,
        _now: DateTime<Utc>,
    ) -> Result<(), CuroError> {
        Ok(())
    }

    async fn recent_for_target(
        &self,
        _target_id: &str,
        _limit: u32,
    ) -> Result<Vec<DeliveryLogEntry>, CuroError> {
        Ok(Vec::new())
    }
}
