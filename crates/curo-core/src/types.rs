// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Curo engagement engine.
//!
//! Rules, sequences, and targets are owned by external stores and are
//! read-only projections here. The only engine-owned persisted type is
//! [`DeliveryLogEntry`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Messaging channel a rule or sequence step dispatches through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Chat,
    Email,
    Sms,
}

impl ChannelKind {
    /// Whether this channel addresses targets by phone number.
    pub fn is_phone_based(self) -> bool {
        matches!(self, ChannelKind::Chat | ChannelKind::Sms)
    }
}

/// Kind of record a notification targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Patient,
    Lead,
}

/// Named condition selecting which eligibility resolver variant applies
/// to a drip sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    NewLead,
    #[strum(serialize = "inactive_30_days")]
    #[serde(rename = "inactive_30_days")]
    Inactive30Days,
    AfterAppointment,
}

/// Rule family selecting which automation job the runner executes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    AppointmentReminder,
    Birthday,
    NoShow,
    Reactivation,
    Drip,
    WaitlistMatch,
}

/// A patient or lead projection eligible to receive a notification.
///
/// `anchor` carries the rule-relevant timestamp (creation time for leads,
/// last-active time for reactivation candidates).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub kind: TargetKind,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub anchor: DateTime<Utc>,
    /// Birth (month, day). Year is never used for matching.
    pub birth_month_day: Option<(u32, u32)>,
}

impl Target {
    /// The contact usable for the given channel, if the target has one.
    pub fn contact_for(&self, channel: ChannelKind) -> Option<&str> {
        match channel {
            ChannelKind::Chat | ChannelKind::Sms => self.phone.as_deref(),
            ChannelKind::Email => self.email.as_deref(),
        }
    }
}

/// An appointment projection used by reminder and no-show rule families.
///
/// `reminder_sent` is the boolean-flag idempotency representation carried
/// over from the source system; it backs single-shot appointment reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub start_time: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub reminder_sent: bool,
}

impl Appointment {
    /// Project this appointment to a dispatchable target.
    pub fn as_target(&self) -> Target {
        Target {
            id: self.patient_id.clone(),
            kind: TargetKind::Patient,
            name: self.patient_name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            status: self.status.clone(),
            anchor: self.start_time,
            birth_month_day: None,
        }
    }
}

/// An outbound notification rule. Read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRule {
    pub id: String,
    pub family: RuleFamily,
    pub channel: ChannelKind,
    pub template: String,
    pub active: bool,
}

/// One timed, templated message within a drip sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStep {
    pub id: String,
    /// 1-based step position. Order 1 additionally transitions `new`
    /// leads to `contacted` on success.
    pub order: u32,
    pub delay_days: i64,
    pub channel: ChannelKind,
    pub content: String,
    pub subject: Option<String>,
}

/// An ordered set of timed messages fired off a target-level trigger event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DripSequence {
    pub id: String,
    pub name: String,
    pub steps: Vec<SequenceStep>,
    pub triggers: Vec<TriggerKind>,
    pub active: bool,
}

/// Terminal status of a delivery attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// One row of the append-only delivery ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    pub id: i64,
    /// Rule id or sequence step id.
    pub subject_id: String,
    pub target_kind: TargetKind,
    pub target_id: String,
    pub status: DeliveryStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// How long a ledger row blocks re-delivery for its (subject, target) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdempotencyScope {
    /// One-shot rules: any prior row blocks forever.
    Permanent,
    /// Recurring rules: only rows created within the last N days block.
    WithinDays(i64),
}

/// A waitlist entry to be matched against an open slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: String,
    pub patient_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<NaiveTime>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A newly opened appointment slot. Supplied per matching request, never
/// persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub therapist_id: Option<String>,
}

/// Closed time interval `[start, end]`. Both endpoints are included,
/// matching the comparison operators used across all rule families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Inclusive containment check.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Which timestamp field a window query filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorField {
    CreatedAt,
    LastActiveAt,
}

/// Per-target outcome recorded in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Sent,
    Failed,
    Skipped,
}

/// One `details[]` entry of a run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDetail {
    pub target_id: String,
    pub name: String,
    pub channel: ChannelKind,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Aggregate counters and per-target details for one rule-family run.
///
/// Built as a pure accumulator: callers create reports locally and merge
/// them, rather than mutating a shared results object across nested calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub processed: u32,
    pub sent: u32,
    pub failed: u32,
    pub skipped: u32,
    pub details: Vec<TargetDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero-attempt report carrying only an explanatory message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn record_sent(&mut self, target: &Target, channel: ChannelKind) {
        self.processed += 1;
        self.sent += 1;
        self.details.push(TargetDetail {
            target_id: target.id.clone(),
            name: target.name.clone(),
            channel,
            outcome: Outcome::Sent,
            reason: None,
        });
    }

    pub fn record_failed(
        &mut self,
        target: &Target,
        channel: ChannelKind,
        reason: impl Into<String>,
    ) {
        self.processed += 1;
        self.failed += 1;
        self.details.push(TargetDetail {
            target_id: target.id.clone(),
            name: target.name.clone(),
            channel,
            outcome: Outcome::Failed,
            reason: Some(reason.into()),
        });
    }

    pub fn record_skipped(
        &mut self,
        target: &Target,
        channel: ChannelKind,
        reason: impl Into<String>,
    ) {
        self.processed += 1;
        self.skipped += 1;
        self.details.push(TargetDetail {
            target_id: target.id.clone(),
            name: target.name.clone(),
            channel,
            outcome: Outcome::Skipped,
            reason: Some(reason.into()),
        });
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: RunReport) {
        self.processed += other.processed;
        self.sent += other.sent;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.details.extend(other.details);
        if self.message.is_none() {
            self.message = other.message;
        }
    }
}
