// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waitlist matching scorer.
//!
//! Pure ranking over waitlist entries against one open slot. Scoring is
//! additive; entries scoring zero are excluded from the ranking. The sort
//! is stable, so tied entries keep their original iteration order.

use chrono::{DateTime, Utc};
use curo_core::types::{OpenSlot, WaitlistEntry};

/// A waitlist entry with its computed score against one slot.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: WaitlistEntry,
    pub points: i32,
    pub reasons: Vec<String>,
}

/// Maximum number of entries a ranking returns.
pub const RANK_LIMIT: usize = 5;

/// Score one entry against the slot.
///
/// Date proximity dominates, then time proximity; entries with no stated
/// preference get a flat "flexible" bonus on each axis. Longer waits and
/// a reachable phone add smaller bonuses on top.
pub fn score(entry: &WaitlistEntry, slot: &OpenSlot, now: DateTime<Utc>) -> (i32, Vec<String>) {
    let mut points = 0;
    let mut reasons = Vec::new();

    match entry.preferred_date {
        Some(preferred) => {
            let diff_days = (slot.date - preferred).num_days().abs();
            let (date_points, reason) = match diff_days {
                0 => (50, "preferred date matches exactly"),
                1 => (40, "preferred date within 1 day"),
                2..=3 => (25, "preferred date within 3 days"),
                4..=7 => (10, "preferred date within 7 days"),
                _ => (0, ""),
            };
            if date_points > 0 {
                points += date_points;
                reasons.push(reason.to_string());
            }
        }
        None => {
            points += 20;
            reasons.push("flexible on date".to_string());
        }
    }

    match entry.preferred_time {
        Some(preferred) => {
            let diff_minutes = (slot.time - preferred).num_minutes().abs();
            let (time_points, reason) = match diff_minutes {
                0 => (30, "preferred time matches exactly"),
                1..=60 => (20, "preferred time within 1 hour"),
                61..=120 => (10, "preferred time within 2 hours"),
                _ => (0, ""),
            };
            if time_points > 0 {
                points += time_points;
                reasons.push(reason.to_string());
            }
        }
        None => {
            points += 15;
            reasons.push("flexible on time".to_string());
        }
    }

    let waiting_days = (now - entry.created_at).num_days();
    if waiting_days >= 7 {
        points += 15;
        reasons.push(format!("waiting {waiting_days} days"));
    } else if waiting_days >= 3 {
        points += 10;
        reasons.push(format!("waiting {waiting_days} days"));
    }

    if entry.phone.is_some() {
        points += 5;
        reasons.push("phone on file".to_string());
    }

    (points, reasons)
}

/// Rank entries against the slot: score each, drop non-positive scores,
/// stable-sort descending, keep the top [`RANK_LIMIT`].
pub fn rank(entries: &[WaitlistEntry], slot: &OpenSlot, now: DateTime<Utc>) -> Vec<ScoredEntry> {
    let mut scored: Vec<ScoredEntry> = entries
        .iter()
        .filter_map(|entry| {
            let (points, reasons) = score(entry, slot, now);
            (points > 0).then(|| ScoredEntry {
                entry: entry.clone(),
                points,
                reasons,
            })
        })
        .collect();
    scored.sort_by(|a, b| b.points.cmp(&a.points));
    scored.truncate(RANK_LIMIT);
    scored
}
