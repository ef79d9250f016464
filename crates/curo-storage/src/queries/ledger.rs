// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery ledger operations.
//!
//! The claim path is a single `INSERT ... SELECT ... WHERE NOT EXISTS`
//! statement so the existence check and the insert cannot be interleaved
//! by a concurrent run. Rows are inserted as `pending` and finalized to
//! `sent` or `failed`; a pending row that is never finalized still blocks.

use chrono::{DateTime, Duration, Utc};
use curo_core::{CuroError, DeliveryLogEntry, DeliveryStatus, IdempotencyScope, TargetKind};
use rusqlite::params;

use crate::database::{Database, format_ts, map_tr_err, ts_column};
use crate::queries::parse_col;

/// Lower bound on `created_at` for rows that block re-delivery, or `None`
/// when every prior row blocks.
fn scope_cutoff(scope: IdempotencyScope, now: DateTime<Utc>) -> Option<String> {
    match scope {
        IdempotencyScope::Permanent => None,
        IdempotencyScope::WithinDays(days) => Some(format_ts(now - Duration::days(days))),
    }
}

/// Check whether a blocking attempt exists for (subject, target).
///
/// Advisory only; the authoritative check is [`begin_attempt`].
pub async fn already_notified(
    db: &Database,
    subject_id: &str,
    target_id: &str,
    scope: IdempotencyScope,
    retry_failed: bool,
    now: DateTime<Utc>,
) -> Result<bool, CuroError> {
    let subject_id = subject_id.to_string();
    let target_id = target_id.to_string();
    let cutoff = scope_cutoff(scope, now);
    db.connection()
        .call(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM delivery_log
                      WHERE subject_id = ?1
                        AND target_id = ?2
                        AND (?3 IS NULL OR created_at >= ?3)
                        AND (?4 = 0 OR status <> 'failed'))",
                params![subject_id, target_id, cutoff, retry_failed as i64],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim the right to deliver to (subject, target).
///
/// Inserts a `pending` row unless a blocking row already exists within the
/// scope cutoff. With `retry_failed` set, prior `failed` rows do not block.
/// Returns `true` if the claim succeeded.
pub async fn begin_attempt(
    db: &Database,
    subject_id: &str,
    target_kind: TargetKind,
    target_id: &str,
    scope: IdempotencyScope,
    retry_failed: bool,
    now: DateTime<Utc>,
) -> Result<bool, CuroError> {
    let subject_id = subject_id.to_string();
    let target_kind = target_kind.to_string();
    let target_id = target_id.to_string();
    let cutoff = scope_cutoff(scope, now);
    let created_at = format_ts(now);
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO delivery_log (subject_id, target_kind, target_id, status, created_at)
                 SELECT ?1, ?2, ?3, 'pending', ?4
                  WHERE NOT EXISTS (
                        SELECT 1 FROM delivery_log
                         WHERE subject_id = ?1
                           AND target_id = ?3
                           AND (?5 IS NULL OR created_at >= ?5)
                           AND (?6 = 0 OR status <> 'failed'))",
                params![
                    subject_id,
                    target_kind,
                    target_id,
                    created_at,
                    cutoff,
                    retry_failed as i64
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Record the terminal status of a claimed attempt.
///
/// Finalizing the most recent pending row is the only mutation the ledger
/// permits; identity columns are never updated.
pub async fn finish_attempt(
    db: &Database,
    subject_id: &str,
    target_id: &str,
    status: DeliveryStatus,
    error_message: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), CuroError> {
    let subject_id = subject_id.to_string();
    let target_id = target_id.to_string();
    let status_text = status.to_string();
    let sent_at = match status {
        DeliveryStatus::Sent => Some(format_ts(now)),
        DeliveryStatus::Failed => None,
    };
    let error_message = error_message.map(str::to_string);
    let log_subject = subject_id.clone();
    let log_target = target_id.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE delivery_log
                    SET status = ?1, sent_at = ?2, error_message = ?3
                  WHERE id = (SELECT id FROM delivery_log
                               WHERE subject_id = ?4 AND target_id = ?5
                                 AND status = 'pending'
                               ORDER BY id DESC LIMIT 1)",
                params![status_text, sent_at, error_message, subject_id, target_id],
            )?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)?;

    if updated == 0 {
        tracing::warn!(
            subject_id = %log_subject,
            target_id = %log_target,
            "finish_attempt found no pending row"
        );
    }
    Ok(())
}

/// Most recent terminal attempts for a target, newest first.
pub async fn recent_for_target(
    db: &Database,
    target_id: &str,
    limit: u32,
) -> Result<Vec<DeliveryLogEntry>, CuroError> {
    let target_id = target_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject_id, target_kind, target_id, status,
                        sent_at, error_message, created_at
                   FROM delivery_log
                  WHERE target_id = ?1 AND status <> 'pending'
                  ORDER BY id DESC
                  LIMIT ?2",
            )?;
            let entries = stmt
                .query_map(params![target_id, limit], |row| {
                    let kind_raw: String = row.get(2)?;
                    let status_raw: String = row.get(4)?;
                    let sent_at_raw: Option<String> = row.get(5)?;
                    let created_at_raw: String = row.get(7)?;
                    Ok(DeliveryLogEntry {
                        id: row.get(0)?,
                        subject_id: row.get(1)?,
                        target_kind: parse_col(2, &kind_raw)?,
                        target_id: row.get(3)?,
                        status: parse_col(4, &status_raw)?,
                        sent_at: sent_at_raw.as_deref().map(|s| ts_column(5, s)).transpose()?,
                        error_message: row.get(6)?,
                        created_at: ts_column(7, &created_at_raw)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, day, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn first_claim_succeeds_second_is_blocked() {
        let (db, _dir) = setup_db().await;
        let now = at(10, 12);

        let claimed = begin_attempt(
            &db,
            "rule-1",
            TargetKind::Patient,
            "p1",
            IdempotencyScope::Permanent,
            false,
            now,
        )
        .await
        .unwrap();
        assert!(claimed);

        // Re-claim for the same pair is blocked even before finalization.
        let claimed = begin_attempt(
            &db,
            "rule-1",
            TargetKind::Patient,
            "p1",
            IdempotencyScope::Permanent,
            false,
            now,
        )
        .await
        .unwrap();
        assert!(!claimed);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claims_are_scoped_per_subject_and_target() {
        let (db, _dir) = setup_db().await;
        let now = at(10, 12);

        assert!(
            begin_attempt(
                &db,
                "rule-1",
                TargetKind::Patient,
                "p1",
                IdempotencyScope::Permanent,
                false,
                now
            )
            .await
            .unwrap()
        );
        // Different target, same subject.
        assert!(
            begin_attempt(
                &db,
                "rule-1",
                TargetKind::Patient,
                "p2",
                IdempotencyScope::Permanent,
                false,
                now
            )
            .await
            .unwrap()
        );
        // Different subject, same target.
        assert!(
            begin_attempt(
                &db,
                "rule-2",
                TargetKind::Patient,
                "p1",
                IdempotencyScope::Permanent,
                false,
                now
            )
            .await
            .unwrap()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn within_days_scope_unblocks_after_cutoff() {
        let (db, _dir) = setup_db().await;

        let first = at(1, 9);
        assert!(
            begin_attempt(
                &db,
                "birthday",
                TargetKind::Patient,
                "p1",
                IdempotencyScope::WithinDays(30),
                false,
                first
            )
            .await
            .unwrap()
        );
        finish_attempt(&db, "birthday", "p1", DeliveryStatus::Sent, None, first)
            .await
            .unwrap();

        // 10 days later: still inside the 30-day scope.
        let soon = first + Duration::days(10);
        assert!(
            !begin_attempt(
                &db,
                "birthday",
                TargetKind::Patient,
                "p1",
                IdempotencyScope::WithinDays(30),
                false,
                soon
            )
            .await
            .unwrap()
        );

        // 31 days later: the old row no longer blocks.
        let later = first + Duration::days(31);
        assert!(
            begin_attempt(
                &db,
                "birthday",
                TargetKind::Patient,
                "p1",
                IdempotencyScope::WithinDays(30),
                false,
                later
            )
            .await
            .unwrap()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_attempt_blocks_unless_retry_enabled() {
        let (db, _dir) = setup_db().await;
        let now = at(10, 12);

        assert!(
            begin_attempt(
                &db,
                "rule-1",
                TargetKind::Lead,
                "l1",
                IdempotencyScope::Permanent,
                false,
                now
            )
            .await
            .unwrap()
        );
        finish_attempt(
            &db,
            "rule-1",
            "l1",
            DeliveryStatus::Failed,
            Some("gateway rejected"),
            now,
        )
        .await
        .unwrap();

        // Default policy: a failed attempt is terminal.
        assert!(
            !begin_attempt(
                &db,
                "rule-1",
                TargetKind::Lead,
                "l1",
                IdempotencyScope::Permanent,
                false,
                now
            )
            .await
            .unwrap()
        );

        // With retry enabled, the failed row does not block.
        assert!(
            begin_attempt(
                &db,
                "rule-1",
                TargetKind::Lead,
                "l1",
                IdempotencyScope::Permanent,
                true,
                now
            )
            .await
            .unwrap()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn already_notified_matches_begin_attempt_semantics() {
        let (db, _dir) = setup_db().await;
        let now = at(10, 12);

        assert!(
            !already_notified(&db, "rule-1", "p1", IdempotencyScope::Permanent, false, now)
                .await
                .unwrap()
        );

        begin_attempt(
            &db,
            "rule-1",
            TargetKind::Patient,
            "p1",
            IdempotencyScope::Permanent,
            false,
            now,
        )
        .await
        .unwrap();

        assert!(
            already_notified(&db, "rule-1", "p1", IdempotencyScope::Permanent, false, now)
                .await
                .unwrap()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn finish_attempt_records_terminal_status() {
        let (db, _dir) = setup_db().await;
        let now = at(10, 12);

        begin_attempt(
            &db,
            "rule-1",
            TargetKind::Patient,
            "p1",
            IdempotencyScope::Permanent,
            false,
            now,
        )
        .await
        .unwrap();
        finish_attempt(&db, "rule-1", "p1", DeliveryStatus::Sent, None, now)
            .await
            .unwrap();

        let entries = recent_for_target(&db, "p1", 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject_id, "rule-1");
        assert_eq!(entries[0].status, DeliveryStatus::Sent);
        assert_eq!(entries[0].sent_at, Some(now));
        assert_eq!(entries[0].error_message, None);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn finish_attempt_without_a_claim_is_a_logged_no_op() {
        let (db, _dir) = setup_db().await;
        let now = at(10, 12);

        finish_attempt(&db, "rule-1", "p1", DeliveryStatus::Sent, None, now)
            .await
            .unwrap();

        assert!(recent_for_target(&db, "p1", 10).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_for_target_is_newest_first_and_skips_pending() {
        let (db, _dir) = setup_db().await;

        for (i, day) in [1u32, 2, 3].iter().enumerate() {
            let when = at(*day, 9);
            let subject = format!("rule-{i}");
            begin_attempt(
                &db,
                &subject,
                TargetKind::Patient,
                "p1",
                IdempotencyScope::Permanent,
                false,
                when,
            )
            .await
            .unwrap();
            finish_attempt(&db, &subject, "p1", DeliveryStatus::Sent, None, when)
                .await
                .unwrap();
        }
        // A pending claim never shows up in audit output.
        begin_attempt(
            &db,
            "rule-9",
            TargetKind::Patient,
            "p1",
            IdempotencyScope::Permanent,
            false,
            at(4, 9),
        )
        .await
        .unwrap();

        let entries = recent_for_target(&db, "p1", 2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subject_id, "rule-2");
        assert_eq!(entries[1].subject_id, "rule-1");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_claims_admit_exactly_one() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("race.db");
        let db = std::sync::Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());
        let now = at(10, 12);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                begin_attempt(
                    &db,
                    "rule-1",
                    TargetKind::Patient,
                    "p1",
                    IdempotencyScope::Permanent,
                    false,
                    now,
                )
                .await
                .unwrap()
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
