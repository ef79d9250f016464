// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `DeliveryLedger` with the same blocking semantics as the
//! SQLite ledger: claims insert a pending row under one lock, so the
//! existence check and the insert are atomic.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use curo_core::traits::DeliveryLedger;
use curo_core::types::{DeliveryLogEntry, DeliveryStatus, IdempotencyScope};
use curo_core::{CuroError, TargetKind};

#[derive(Debug, Clone)]
struct Row {
    id: i64,
    subject_id: String,
    target_kind: TargetKind,
    target_id: String,
    /// `None` while pending.
    status: Option<DeliveryStatus>,
    sent_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

/// In-memory delivery ledger.
pub struct MemoryLedger {
    rows: Mutex<Vec<Row>>,
    retry_failed: bool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_retry_policy(false)
    }

    pub fn with_retry_policy(retry_failed: bool) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            retry_failed,
        }
    }

    fn blocks(&self, row: &Row, scope: IdempotencyScope, now: DateTime<Utc>) -> bool {
        let in_scope = match scope {
            IdempotencyScope::Permanent => true,
            IdempotencyScope::WithinDays(days) => row.created_at >= now - Duration::days(days),
        };
        let status_blocks = if self.retry_failed {
            row.status != Some(DeliveryStatus::Failed)
        } else {
            true
        };
        in_scope && status_blocks
    }

    /// Total number of rows, pending included. For zero-write assertions.
    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Number of `sent` rows for (subject, target). For idempotency assertions.
    pub fn sent_count(&self, subject_id: &str, target_id: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.subject_id == subject_id
                    && r.target_id == target_id
                    && r.status == Some(DeliveryStatus::Sent)
            })
            .count()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryLedger for MemoryLedger {
    async fn already_notified(
        &self,
        subject_id: &str,
        target_id: &str,
        scope: IdempotencyScope,
        now: DateTime<Utc>,
    ) -> Result<bool, CuroError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().any(|r| {
            r.subject_id == subject_id && r.target_id == target_id && self.blocks(r, scope, now)
        }))
    }

    async fn begin_attempt(
        &self,
        subject_id: &str,
        target_kind: TargetKind,
        target_id: &str,
        scope: IdempotencyScope,
        now: DateTime<Utc>,
    ) -> Result<bool, CuroError> {
        let mut rows = self.rows.lock().unwrap();
        let blocked = rows.iter().any(|r| {
            r.subject_id == subject_id && r.target_id == target_id && self.blocks(r, scope, now)
        });
        if blocked {
            return Ok(false);
        }
        let id = rows.len() as i64 + 1;
        rows.push(Row {
            id,
            subject_id: subject_id.to_string(),
            target_kind,
            target_id: target_id.to_string(),
            status: None,
            sent_at: None,
            error_message: None,
            created_at: now,
        });
        Ok(true)
    }

    async fn finish_attempt(
        &self,
        subject_id: &str,
        target_id: &str,
        status: DeliveryStatus,
        error_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), CuroError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows
            .iter_mut()
            .rev()
            .find(|r| r.subject_id == subject_id && r.target_id == target_id && r.status.is_none())
        {
            row.status = Some(status);
            row.error_message = error_message.map(str::to_string);
            if status == DeliveryStatus::Sent {
                row.sent_at = Some(now);
            }
        }
        Ok(())
    }

    async fn recent_for_target(
        &self,
        target_id: &str,
        limit: u32,
    ) -> Result<Vec<DeliveryLogEntry>, CuroError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|r| r.target_id == target_id)
            .filter_map(|r| {
                Some(DeliveryLogEntry {
                    id: r.id,
                    subject_id: r.subject_id.clone(),
                    target_kind: r.target_kind,
                    target_id: r.target_id.clone(),
                    status: r.status?,
                    sent_at: r.sent_at,
                    error_message: r.error_message.clone(),
                    created_at: r.created_at,
                })
            })
            .take(limit as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn claim_blocks_repeat_claims() {
        let ledger = MemoryLedger::new();
        assert!(
            ledger
                .begin_attempt("s", TargetKind::Patient, "t", IdempotencyScope::Permanent, now())
                .await
                .unwrap()
        );
        assert!(
            !ledger
                .begin_attempt("s", TargetKind::Patient, "t", IdempotencyScope::Permanent, now())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn retry_policy_unblocks_failed_rows() {
        let ledger = MemoryLedger::with_retry_policy(true);
        ledger
            .begin_attempt("s", TargetKind::Lead, "t", IdempotencyScope::Permanent, now())
            .await
            .unwrap();
        ledger
            .finish_attempt("s", "t", DeliveryStatus::Failed, Some("boom"), now())
            .await
            .unwrap();
        assert!(
            ledger
                .begin_attempt("s", TargetKind::Lead, "t", IdempotencyScope::Permanent, now())
                .await
                .unwrap()
        );
    }
}
