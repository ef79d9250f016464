// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-family eligibility resolution.
//!
//! Each resolver computes a candidate list from a closed time window, a
//! status filter, and the ledger-backed exclusion predicate. Storage
//! errors propagate and abort the whole run; no partial candidate list is
//! ever used. Trigger-kind dispatch is a match over the closed
//! [`TriggerKind`] enum, not string branching.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use curo_config::model::EngineConfig;
use curo_core::traits::{DeliveryLedger, TargetStore};
use curo_core::types::{AnchorField, Appointment, IdempotencyScope, Target, Window};
use curo_core::{ChannelKind, CuroError, TargetKind, TriggerKind};

/// Skip reason for targets lacking the rule channel's contact.
pub const MISSING_CONTACT: &str = "missing contact";

/// A resolved target, its contact for the rule channel, and an optional
/// reason it must not be dispatched to.
///
/// Skipped candidates are still counted by the runner; they are never
/// silently dropped.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub target: Target,
    pub contact: Option<String>,
    pub skip_reason: Option<String>,
}

impl Candidate {
    /// Resolve the target's contact for `channel`, flagging the candidate
    /// as skipped when it is missing.
    pub fn for_channel(target: Target, channel: ChannelKind) -> Self {
        let contact = target.contact_for(channel).map(str::to_string);
        let skip_reason = contact.is_none().then(|| MISSING_CONTACT.to_string());
        Self {
            target,
            contact,
            skip_reason,
        }
    }
}

/// Resolver over the external target store and the delivery ledger.
pub struct EligibilityResolver<'a> {
    pub store: &'a dyn TargetStore,
    pub ledger: &'a dyn DeliveryLedger,
}

impl EligibilityResolver<'_> {
    /// Scheduled appointments starting within the next `hours_ahead`
    /// hours whose reminder flag is still unset.
    pub async fn due_appointments(
        &self,
        hours_ahead: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, CuroError> {
        let window = Window::new(now, now + Duration::hours(hours_ahead));
        let appointments = self
            .store
            .appointments_in_window(&window, "scheduled")
            .await?;
        Ok(appointments
            .into_iter()
            .filter(|a| !a.reminder_sent)
            .collect())
    }

    /// Patients whose birthday is today, month and day only.
    ///
    /// Feb 29 birthdays fire on Feb 28 in non-leap years, so they are
    /// never silently lost.
    pub async fn birthday_targets(&self, now: DateTime<Utc>) -> Result<Vec<Target>, CuroError> {
        let today = now.date_naive();
        let mut targets = self
            .store
            .targets_with_birthday(today.month(), today.day())
            .await?;
        if today.month() == 2 && today.day() == 28 && !is_leap_year(today.year()) {
            targets.extend(self.store.targets_with_birthday(2, 29).await?);
        }
        Ok(targets)
    }

    /// Appointments still `scheduled` whose start time passed at least
    /// `hours_ago` hours ago, scanning `lookback_hours` further back.
    pub async fn no_show_appointments(
        &self,
        hours_ago: i64,
        lookback_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, CuroError> {
        let end = now - Duration::hours(hours_ago);
        let window = Window::new(end - Duration::hours(lookback_hours), end);
        self.store.appointments_in_window(&window, "scheduled").await
    }

    /// Patients last active at least `days_inactive` days ago, scanning
    /// `lookback_days` further back.
    pub async fn inactive_targets(
        &self,
        days_inactive: i64,
        lookback_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Target>, CuroError> {
        let end = now - Duration::days(days_inactive);
        let window = Window::new(end - Duration::days(lookback_days), end);
        self.store
            .targets_in_window(TargetKind::Patient, AnchorField::LastActiveAt, &window, None)
            .await
    }

    /// Baseline targets for a drip trigger kind. Per-step ledger
    /// exclusion happens in the drip engine, not here.
    pub async fn trigger_targets(
        &self,
        trigger: TriggerKind,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> Result<Vec<Target>, CuroError> {
        match trigger {
            TriggerKind::NewLead => {
                let window = Window::new(now - Duration::days(config.lead_lookback_days), now);
                self.store
                    .targets_in_window(TargetKind::Lead, AnchorField::CreatedAt, &window, None)
                    .await
            }
            TriggerKind::Inactive30Days => {
                let end = now - Duration::days(30);
                let window = Window::new(end - Duration::days(config.inactive_lookback_days), end);
                self.store
                    .targets_in_window(TargetKind::Patient, AnchorField::LastActiveAt, &window, None)
                    .await
            }
            TriggerKind::AfterAppointment => {
                let window = Window::new(now - Duration::days(config.lead_lookback_days), now);
                let appointments = self
                    .store
                    .appointments_in_window(&window, "completed")
                    .await?;
                Ok(appointments.iter().map(Appointment::as_target).collect())
            }
        }
    }

    /// Drop targets with a blocking ledger row for `subject_id`.
    pub async fn filter_notified(
        &self,
        subject_id: &str,
        scope: IdempotencyScope,
        targets: Vec<Target>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Target>, CuroError> {
        let mut eligible = Vec::with_capacity(targets.len());
        for target in targets {
            if !self
                .ledger
                .already_notified(subject_id, &target.id, scope, now)
                .await?
            {
                eligible.push(target);
            }
        }
        Ok(eligible)
    }
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}
