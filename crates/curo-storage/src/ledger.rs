// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`DeliveryLedger`] adapter backed by the `delivery_log` table.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curo_core::traits::DeliveryLedger;
use curo_core::{CuroError, DeliveryLogEntry, DeliveryStatus, IdempotencyScope, TargetKind};

use crate::database::Database;
use crate::queries::ledger as queries;

/// Row-based delivery ledger.
///
/// `retry_failed` selects which prior rows block a new claim: with it off
/// (the default) a failed attempt is terminal and never retried; with it
/// on only pending and sent rows block.
pub struct SqliteLedger {
    db: Arc<Database>,
    retry_failed: bool,
}

impl SqliteLedger {
    pub fn new(db: Arc<Database>, retry_failed: bool) -> Self {
        Self { db, retry_failed }
    }
}

#[async_trait]
impl DeliveryLedger for SqliteLedger {
    async fn already_notified(
        &self,
        subject_id: &str,
        target_id: &str,
        scope: IdempotencyScope,
        now: DateTime<Utc>,
    ) -> Result<bool, CuroError> {
        queries::already_notified(&self.db, subject_id, target_id, scope, self.retry_failed, now)
            .await
    }

    async fn begin_attempt(
        &self,
        subject_id: &str,
        target_kind: TargetKind,
        target_id: &str,
        scope: IdempotencyScope,
        now: DateTime<Utc>,
    ) -> Result<bool, CuroError> {
        queries::begin_attempt(
            &self.db,
            subject_id,
            target_kind,
            target_id,
            scope,
            self.retry_failed,
            now,
        )
        .await
    }

    async fn finish_attempt(
        &self,
        subject_id: &str,
        target_id: &str,
        status: DeliveryStatus,
        error_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), CuroError> {
        queries::finish_attempt(&self.db, subject_id, target_id, status, error_message, now).await
    }

    async fn recent_for_target(
        &self,
        target_id: &str,
        limit: u32,
    ) -> Result<Vec<DeliveryLogEntry>, CuroError> {
        queries::recent_for_target(&self.db, target_id, limit).await
    }
}
