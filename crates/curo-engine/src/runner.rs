// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automation job runner.
//!
//! Orchestrates one rule family end-to-end: resolve candidates, render the
//! rule template, dispatch through the paced channel dispatcher, and record
//! each attempt in the delivery ledger. Per-target failures fold into the
//! run report; storage errors abort the whole run. An unavailable channel
//! short-circuits before any candidate is touched or any ledger row is
//! written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use curo_config::model::EngineConfig;
use curo_core::template;
use curo_core::traits::{DeliveryLedger, TargetStore};
use curo_core::types::{
    DeliveryStatus, DripSequence, IdempotencyScope, NotificationRule, OpenSlot, RunReport, Target,
};
use curo_core::{ChannelGateway, CuroError, RuleFamily, TargetKind};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::dispatcher::{Dispatcher, SendOutcome};
use crate::drip;
use crate::eligibility::{Candidate, EligibilityResolver, MISSING_CONTACT};
use crate::flags::FlagLedger;

/// Default reminder horizon when a run supplies none.
const DEFAULT_HOURS_AHEAD: i64 = 24;
/// Default inactivity threshold for reactivation runs.
const DEFAULT_DAYS_INACTIVE: i64 = 30;
/// Marker appended to an appointment's notes after a no-show follow-up.
const NO_SHOW_NOTE: &str = "[automação] follow-up de falta enviado";

/// Per-run parameters. All fields are optional; families validate the
/// ones they require.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunParams {
    /// Reminder horizon in hours (appointment_reminder).
    pub hours_ahead: Option<i64>,
    /// How long ago the appointment should have started (no_show).
    pub hours_ago: Option<i64>,
    /// Inactivity threshold in days (reactivation).
    pub days_inactive: Option<i64>,
    /// The open slot to match against (waitlist_match).
    pub slot: Option<OpenSlot>,
    /// Whether waitlist matching also notifies the ranked entries.
    pub notify: Option<bool>,
}

/// Executes automation runs over the configured stores and gateways.
pub struct JobRunner {
    store: Arc<dyn TargetStore>,
    ledger: Arc<dyn DeliveryLedger>,
    flag_ledger: FlagLedger,
    gateways: Vec<Arc<dyn ChannelGateway>>,
    rules: Vec<NotificationRule>,
    sequences: Vec<DripSequence>,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn TargetStore>,
        ledger: Arc<dyn DeliveryLedger>,
        gateways: Vec<Arc<dyn ChannelGateway>>,
        rules: Vec<NotificationRule>,
        sequences: Vec<DripSequence>,
        config: EngineConfig,
    ) -> Self {
        Self {
            flag_ledger: FlagLedger::new(store.clone()),
            store,
            ledger,
            gateways,
            rules,
            sequences,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token; honored between targets, never
    /// mid-send.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn rule_for(&self, family: RuleFamily) -> Result<&NotificationRule, CuroError> {
        self.rules
            .iter()
            .find(|r| r.family == family && r.active)
            .ok_or_else(|| CuroError::RuleNotFound {
                family: family.to_string(),
            })
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.gateways.iter().cloned(), &self.config)
    }

    fn resolver(&self) -> EligibilityResolver<'_> {
        EligibilityResolver {
            store: self.store.as_ref(),
            ledger: self.ledger.as_ref(),
        }
    }

    /// Run one rule family and return its aggregate report.
    pub async fn run(
        &self,
        family: RuleFamily,
        params: RunParams,
        now: DateTime<Utc>,
    ) -> Result<RunReport, CuroError> {
        let report = match family {
            RuleFamily::AppointmentReminder => self.run_reminders(&params, now).await?,
            RuleFamily::Birthday => self.run_birthdays(now).await?,
            RuleFamily::NoShow => self.run_no_shows(&params, now).await?,
            RuleFamily::Reactivation => self.run_reactivation(&params, now).await?,
            RuleFamily::Drip => self.run_drip(now).await?,
            RuleFamily::WaitlistMatch => self.run_waitlist(&params, now).await?,
        };
        info!(
            %family,
            processed = report.processed,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "automation run finished"
        );
        Ok(report)
    }

    /// Informational candidate count for a family. No side effects.
    pub async fn pending_count(
        &self,
        family: RuleFamily,
        params: RunParams,
        now: DateTime<Utc>,
    ) -> Result<u32, CuroError> {
        let resolver = self.resolver();
        let count = match family {
            RuleFamily::AppointmentReminder => {
                let hours = params.hours_ahead.unwrap_or(DEFAULT_HOURS_AHEAD);
                resolver.due_appointments(hours, now).await?.len()
            }
            RuleFamily::Birthday => {
                let rule = self.rule_for(family)?;
                let targets = resolver.birthday_targets(now).await?;
                let scope = IdempotencyScope::WithinDays(self.config.recurring_scope_days);
                resolver
                    .filter_notified(&rule.id, scope, targets, now)
                    .await?
                    .len()
            }
            RuleFamily::NoShow => {
                let hours_ago = require(params.hours_ago, "hours_ago")?;
                resolver
                    .no_show_appointments(hours_ago, self.config.no_show_lookback_hours, now)
                    .await?
                    .len()
            }
            RuleFamily::Reactivation => {
                let rule = self.rule_for(family)?;
                let days = params.days_inactive.unwrap_or(DEFAULT_DAYS_INACTIVE);
                let targets = resolver
                    .inactive_targets(days, self.config.inactive_lookback_days, now)
                    .await?;
                let scope = IdempotencyScope::WithinDays(self.config.recurring_scope_days);
                resolver
                    .filter_notified(&rule.id, scope, targets, now)
                    .await?
                    .len()
            }
            RuleFamily::Drip => {
                let mut pending = 0u32;
                for sequence in self.sequences.iter().filter(|s| s.active) {
                    pending += drip::pending_steps(
                        self.store.as_ref(),
                        self.ledger.as_ref(),
                        &self.config,
                        sequence,
                        now,
                    )
                    .await?;
                }
                return Ok(pending);
            }
            RuleFamily::WaitlistMatch => {
                let slot = require(params.slot, "slot")?;
                let entries = self.store.active_waitlist().await?;
                crate::waitlist::rank(&entries, &slot, now).len()
            }
        };
        Ok(count as u32)
    }

    async fn run_reminders(
        &self,
        params: &RunParams,
        now: DateTime<Utc>,
    ) -> Result<RunReport, CuroError> {
        let rule = self.rule_for(RuleFamily::AppointmentReminder)?;
        let mut dispatcher = self.dispatcher();
        if !dispatcher.is_available(rule.channel) {
            return Ok(RunReport::with_message("channel not configured"));
        }

        let hours = params.hours_ahead.unwrap_or(DEFAULT_HOURS_AHEAD);
        let appointments = self.resolver().due_appointments(hours, now).await?;

        let mut report = RunReport::new();
        for appointment in &appointments {
            if self.cancel.is_cancelled() {
                report.message = Some("run cancelled".to_string());
                return Ok(report);
            }
            let target = appointment.as_target();
            let vars = template_vars(&[
                ("nome", appointment.patient_name.clone()),
                ("data", appointment.start_time.format("%d/%m/%Y").to_string()),
                ("hora", appointment.start_time.format("%H:%M").to_string()),
            ]);
            let text = template::render(&rule.template, &vars);
            deliver(
                &self.flag_ledger,
                &mut dispatcher,
                &mut report,
                &rule.id,
                &appointment.id,
                IdempotencyScope::Permanent,
                &target,
                rule.channel,
                None,
                &text,
                now,
            )
            .await?;
        }
        Ok(report)
    }

    async fn run_birthdays(&self, now: DateTime<Utc>) -> Result<RunReport, CuroError> {
        let rule = self.rule_for(RuleFamily::Birthday)?;
        let mut dispatcher = self.dispatcher();
        if !dispatcher.is_available(rule.channel) {
            return Ok(RunReport::with_message("channel not configured"));
        }

        let scope = IdempotencyScope::WithinDays(self.config.recurring_scope_days);
        let targets = self.resolver().birthday_targets(now).await?;

        let mut report = RunReport::new();
        for target in &targets {
            if self.cancel.is_cancelled() {
                report.message = Some("run cancelled".to_string());
                return Ok(report);
            }
            let vars = template_vars(&[("nome", target.name.clone())]);
            let text = template::render(&rule.template, &vars);
            deliver(
                self.ledger.as_ref(),
                &mut dispatcher,
                &mut report,
                &rule.id,
                &target.id,
                scope,
                target,
                rule.channel,
                None,
                &text,
                now,
            )
            .await?;
        }
        Ok(report)
    }

    async fn run_no_shows(
        &self,
        params: &RunParams,
        now: DateTime<Utc>,
    ) -> Result<RunReport, CuroError> {
        let rule = self.rule_for(RuleFamily::NoShow)?;
        let hours_ago = require(params.hours_ago, "hours_ago")?;
        let mut dispatcher = self.dispatcher();
        if !dispatcher.is_available(rule.channel) {
            return Ok(RunReport::with_message("channel not configured"));
        }

        let appointments = self
            .resolver()
            .no_show_appointments(hours_ago, self.config.no_show_lookback_hours, now)
            .await?;

        let mut report = RunReport::new();
        for appointment in &appointments {
            if self.cancel.is_cancelled() {
                report.message = Some("run cancelled".to_string());
                return Ok(report);
            }
            // The missed appointment is marked regardless of whether the
            // follow-up message can be delivered.
            self.store
                .update_appointment_status(&appointment.id, "no_show")
                .await?;

            let target = appointment.as_target();
            let vars = template_vars(&[
                ("nome", appointment.patient_name.clone()),
                ("data", appointment.start_time.format("%d/%m/%Y").to_string()),
            ]);
            let text = template::render(&rule.template, &vars);
            // One ledger row per missed appointment, not per patient.
            let subject_id = format!("{}:{}", rule.id, appointment.id);
            let sent = deliver(
                self.ledger.as_ref(),
                &mut dispatcher,
                &mut report,
                &subject_id,
                &target.id,
                IdempotencyScope::Permanent,
                &target,
                rule.channel,
                None,
                &text,
                now,
            )
            .await?;
            if sent {
                self.store
                    .append_appointment_note(&appointment.id, NO_SHOW_NOTE)
                    .await?;
            }
        }
        Ok(report)
    }

    async fn run_reactivation(
        &self,
        params: &RunParams,
        now: DateTime<Utc>,
    ) -> Result<RunReport, CuroError> {
        let rule = self.rule_for(RuleFamily::Reactivation)?;
        let mut dispatcher = self.dispatcher();
        if !dispatcher.is_available(rule.channel) {
            return Ok(RunReport::with_message("channel not configured"));
        }

        let days = params.days_inactive.unwrap_or(DEFAULT_DAYS_INACTIVE);
        let scope = IdempotencyScope::WithinDays(self.config.recurring_scope_days);
        let targets = self
            .resolver()
            .inactive_targets(days, self.config.inactive_lookback_days, now)
            .await?;

        let mut report = RunReport::new();
        for target in &targets {
            if self.cancel.is_cancelled() {
                report.message = Some("run cancelled".to_string());
                return Ok(report);
            }
            let vars = template_vars(&[("nome", target.name.clone())]);
            let text = template::render(&rule.template, &vars);
            deliver(
                self.ledger.as_ref(),
                &mut dispatcher,
                &mut report,
                &rule.id,
                &target.id,
                scope,
                target,
                rule.channel,
                None,
                &text,
                now,
            )
            .await?;
        }
        Ok(report)
    }

    async fn run_drip(&self, now: DateTime<Utc>) -> Result<RunReport, CuroError> {
        let active: Vec<&DripSequence> = self.sequences.iter().filter(|s| s.active).collect();
        if active.is_empty() {
            return Ok(RunReport::with_message("no active sequences"));
        }

        let mut dispatcher = self.dispatcher();
        let mut report = RunReport::new();
        for sequence in active {
            let partial = drip::run_sequence(
                self.store.as_ref(),
                self.ledger.as_ref(),
                &mut dispatcher,
                &self.config,
                sequence,
                &self.cancel,
                now,
            )
            .await?;
            let cancelled = partial.message.as_deref() == Some("run cancelled");
            report.merge(partial);
            if cancelled {
                break;
            }
        }
        Ok(report)
    }

    async fn run_waitlist(
        &self,
        params: &RunParams,
        now: DateTime<Utc>,
    ) -> Result<RunReport, CuroError> {
        let rule = self.rule_for(RuleFamily::WaitlistMatch)?;
        let slot = require(params.slot.clone(), "slot")?;

        let entries = self.store.active_waitlist().await?;
        let ranked = crate::waitlist::rank(&entries, &slot, now);

        if !params.notify.unwrap_or(true) {
            return Ok(RunReport::with_message(format!(
                "{} candidates ranked",
                ranked.len()
            )));
        }

        let mut dispatcher = self.dispatcher();
        if !dispatcher.is_available(rule.channel) {
            return Ok(RunReport::with_message("channel not configured"));
        }

        let mut report = RunReport::new();
        for scored in &ranked {
            if self.cancel.is_cancelled() {
                report.message = Some("run cancelled".to_string());
                return Ok(report);
            }
            let entry = &scored.entry;
            let target = Target {
                id: entry.patient_id.clone().unwrap_or_else(|| entry.id.clone()),
                kind: TargetKind::Patient,
                name: entry.name.clone(),
                phone: entry.phone.clone(),
                email: None,
                status: entry.status.clone(),
                anchor: entry.created_at,
                birth_month_day: None,
            };
            let vars = template_vars(&[
                ("nome", entry.name.clone()),
                ("data", slot.date.format("%d/%m/%Y").to_string()),
                ("hora", slot.time.format("%H:%M").to_string()),
            ]);
            let text = template::render(&rule.template, &vars);
            // One offer round per slot date, keyed by waitlist entry.
            let subject_id = format!("{}:{}", rule.id, slot.date);
            deliver(
                self.ledger.as_ref(),
                &mut dispatcher,
                &mut report,
                &subject_id,
                &entry.id,
                IdempotencyScope::Permanent,
                &target,
                rule.channel,
                None,
                &text,
                now,
            )
            .await?;
        }
        Ok(report)
    }
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, CuroError> {
    value.ok_or_else(|| CuroError::InvalidParams(format!("{name} is required")))
}

fn template_vars(pairs: &[(&str, String)]) -> std::collections::HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Claim, dispatch, and record one message to one target.
///
/// Returns whether the message was delivered. A missing contact is a skip,
/// a lost idempotency claim is silent, and a transport rejection is a
/// failure; none of them abort the batch.
#[allow(clippy::too_many_arguments)]
async fn deliver(
    ledger: &dyn DeliveryLedger,
    dispatcher: &mut Dispatcher,
    report: &mut RunReport,
    subject_id: &str,
    ledger_target_id: &str,
    scope: IdempotencyScope,
    target: &Target,
    channel: curo_core::ChannelKind,
    subject_line: Option<&str>,
    text: &str,
    now: DateTime<Utc>,
) -> Result<bool, CuroError> {
    let candidate = Candidate::for_channel(target.clone(), channel);
    let Some(contact) = candidate.contact.as_deref() else {
        let reason = candidate.skip_reason.as_deref().unwrap_or(MISSING_CONTACT);
        report.record_skipped(target, channel, reason);
        return Ok(false);
    };
    let claimed = ledger
        .begin_attempt(subject_id, target.kind, ledger_target_id, scope, now)
        .await?;
    if !claimed {
        return Ok(false);
    }

    match dispatcher.dispatch(channel, contact, subject_line, text).await {
        SendOutcome::Delivered => {
            ledger
                .finish_attempt(subject_id, ledger_target_id, DeliveryStatus::Sent, None, now)
                .await?;
            report.record_sent(target, channel);
            Ok(true)
        }
        SendOutcome::Rejected(reason) => {
            ledger
                .finish_attempt(
                    subject_id,
                    ledger_target_id,
                    DeliveryStatus::Failed,
                    Some(&reason),
                    now,
                )
                .await?;
            report.record_failed(target, channel, reason);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone};
    use curo_core::ChannelKind;
    use curo_test_utils::{MemoryLedger, MemoryStore, MockGateway, fixtures};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap()
    }

    fn config() -> EngineConfig {
        EngineConfig {
            min_send_interval_ms: 0,
            ..EngineConfig::default()
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        ledger: Arc<MemoryLedger>,
        gateway: Arc<MockGateway>,
        runner: JobRunner,
    }

    fn harness(rules: Vec<NotificationRule>, sequences: Vec<DripSequence>) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MemoryLedger::new());
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        let runner = JobRunner::new(
            store.clone(),
            ledger.clone(),
            vec![gateway.clone() as Arc<dyn ChannelGateway>],
            rules,
            sequences,
            config(),
        );
        Harness {
            store,
            ledger,
            gateway,
            runner,
        }
    }

    #[tokio::test]
    async fn missing_rule_is_an_error() {
        let h = harness(vec![], vec![]);
        let result = h
            .runner
            .run(RuleFamily::Birthday, RunParams::default(), now())
            .await;
        assert!(matches!(result, Err(CuroError::RuleNotFound { .. })));
    }

    #[tokio::test]
    async fn reminder_run_sets_flag_and_sends_once() {
        let rule = fixtures::rule(
            RuleFamily::AppointmentReminder,
            ChannelKind::Chat,
            "Olá {{nome}}, consulta dia {{data}} às {{hora}}",
        );
        let h = harness(vec![rule], vec![]);
        h.store
            .add_appointment(fixtures::appointment("a1", "p1", now() + Duration::hours(3)));

        let report = h
            .runner
            .run(RuleFamily::AppointmentReminder, RunParams::default(), now())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert!(h.store.appointment("a1").unwrap().reminder_sent);

        let sent = h.gateway.sent_messages().await;
        assert!(sent[0].text.contains("10/06/2026"));
        assert!(sent[0].text.contains("15:00"));

        // A second run finds no unflagged appointment.
        let report = h
            .runner
            .run(RuleFamily::AppointmentReminder, RunParams::default(), now())
            .await
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(h.gateway.sent_count().await, 1);
    }

    #[tokio::test]
    async fn unavailable_channel_short_circuits_without_writes() {
        let rule = fixtures::rule(
            RuleFamily::AppointmentReminder,
            ChannelKind::Chat,
            "Olá {{nome}}",
        );
        let h = harness(vec![rule], vec![]);
        h.gateway.set_available(false);
        h.store
            .add_appointment(fixtures::appointment("a1", "p1", now() + Duration::hours(3)));

        let report = h
            .runner
            .run(RuleFamily::AppointmentReminder, RunParams::default(), now())
            .await
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.message.as_deref(), Some("channel not configured"));
        assert!(!h.store.appointment("a1").unwrap().reminder_sent);
        assert_eq!(h.ledger.row_count(), 0);
    }

    #[tokio::test]
    async fn birthday_run_is_scoped_to_the_recurrence_window() {
        let rule = fixtures::rule(
            RuleFamily::Birthday,
            ChannelKind::Chat,
            "Feliz aniversário, {{nome}}!",
        );
        let h = harness(vec![rule], vec![]);
        let mut patient = fixtures::patient("p1", now() - Duration::days(400));
        patient.birth_month_day = Some((6, 10));
        h.store.add_target(patient);

        let report = h
            .runner
            .run(RuleFamily::Birthday, RunParams::default(), now())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(h.ledger.sent_count("rule-birthday", "p1"), 1);

        // Same day, run again: blocked by the scoped ledger row.
        let report = h
            .runner
            .run(RuleFamily::Birthday, RunParams::default(), now())
            .await
            .unwrap();
        assert_eq!(report.sent, 0);

        // Next year (beyond the 30-day scope) the row no longer blocks.
        let next_year = now() + Duration::days(365);
        let report = h
            .runner
            .run(RuleFamily::Birthday, RunParams::default(), next_year)
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
    }

    #[tokio::test]
    async fn no_show_requires_hours_ago() {
        let rule = fixtures::rule(RuleFamily::NoShow, ChannelKind::Chat, "Sentimos sua falta");
        let h = harness(vec![rule], vec![]);
        let result = h
            .runner
            .run(RuleFamily::NoShow, RunParams::default(), now())
            .await;
        assert!(matches!(result, Err(CuroError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn no_show_marks_notes_and_status() {
        let rule = fixtures::rule(
            RuleFamily::NoShow,
            ChannelKind::Chat,
            "Olá {{nome}}, sentimos sua falta",
        );
        let h = harness(vec![rule], vec![]);
        h.store
            .add_appointment(fixtures::appointment("a1", "p1", now() - Duration::hours(3)));

        let params = RunParams {
            hours_ago: Some(2),
            ..RunParams::default()
        };
        let report = h
            .runner
            .run(RuleFamily::NoShow, params, now())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);

        let appointment = h.store.appointment("a1").unwrap();
        assert_eq!(appointment.status, "no_show");
        assert!(appointment.notes.unwrap().contains("follow-up"));
        assert_eq!(h.ledger.sent_count("rule-no_show:a1", "p1"), 1);
    }

    #[tokio::test]
    async fn no_show_without_contact_still_transitions_status() {
        let rule = fixtures::rule(RuleFamily::NoShow, ChannelKind::Chat, "Sentimos sua falta");
        let h = harness(vec![rule], vec![]);
        let mut appointment = fixtures::appointment("a1", "p1", now() - Duration::hours(3));
        appointment.phone = None;
        h.store.add_appointment(appointment);

        let params = RunParams {
            hours_ago: Some(2),
            ..RunParams::default()
        };
        let report = h
            .runner
            .run(RuleFamily::NoShow, params, now())
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);

        let appointment = h.store.appointment("a1").unwrap();
        assert_eq!(appointment.status, "no_show");
        // No send, no note marker.
        assert!(appointment.notes.is_none());
        assert_eq!(h.ledger.row_count(), 0);
    }

    #[tokio::test]
    async fn waitlist_requires_a_slot() {
        let rule = fixtures::rule(RuleFamily::WaitlistMatch, ChannelKind::Chat, "Vaga aberta");
        let h = harness(vec![rule], vec![]);
        let result = h
            .runner
            .run(RuleFamily::WaitlistMatch, RunParams::default(), now())
            .await;
        assert!(matches!(result, Err(CuroError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn waitlist_notifies_ranked_entries() {
        let rule = fixtures::rule(
            RuleFamily::WaitlistMatch,
            ChannelKind::Chat,
            "Olá {{nome}}, vaga dia {{data}} às {{hora}}",
        );
        let h = harness(vec![rule], vec![]);
        h.store.add_waitlist_entry(fixtures::waitlist_entry(
            "w1",
            now() - Duration::days(10),
            Some(NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()),
            Some(NaiveTime::from_hms_opt(14, 0, 0).unwrap()),
        ));
        h.store.add_waitlist_entry(fixtures::waitlist_entry(
            "w2",
            now() - Duration::days(1),
            None,
            None,
        ));

        let params = RunParams {
            slot: Some(OpenSlot {
                date: NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
                time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                therapist_id: None,
            }),
            ..RunParams::default()
        };
        let report = h
            .runner
            .run(RuleFamily::WaitlistMatch, params.clone(), now())
            .await
            .unwrap();
        assert_eq!(report.sent, 2);
        // Best-scoring entry is notified first.
        let sent = h.gateway.sent_messages().await;
        assert!(sent[0].text.contains("Waitlisted w1"));

        // The same slot offered again reaches nobody new.
        let report = h
            .runner
            .run(RuleFamily::WaitlistMatch, params, now())
            .await
            .unwrap();
        assert_eq!(report.sent, 0);
    }

    #[tokio::test]
    async fn waitlist_rank_only_mode_writes_nothing() {
        let rule = fixtures::rule(RuleFamily::WaitlistMatch, ChannelKind::Chat, "Vaga aberta");
        let h = harness(vec![rule], vec![]);
        h.store.add_waitlist_entry(fixtures::waitlist_entry(
            "w1",
            now() - Duration::days(10),
            None,
            None,
        ));

        let params = RunParams {
            slot: Some(OpenSlot {
                date: NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
                time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                therapist_id: None,
            }),
            notify: Some(false),
            ..RunParams::default()
        };
        let report = h
            .runner
            .run(RuleFamily::WaitlistMatch, params, now())
            .await
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.message.as_deref(), Some("1 candidates ranked"));
        assert_eq!(h.ledger.row_count(), 0);
        assert_eq!(h.gateway.sent_count().await, 0);
    }

    #[tokio::test]
    async fn drip_family_runs_active_sequences() {
        let h = harness(vec![], vec![fixtures::drip_sequence(0, 3)]);
        h.store.add_target(fixtures::lead("l1", now() - Duration::days(4)));

        let report = h
            .runner
            .run(RuleFamily::Drip, RunParams::default(), now())
            .await
            .unwrap();
        assert_eq!(report.sent, 2);
    }

    #[tokio::test]
    async fn drip_family_without_sequences_reports_a_message() {
        let h = harness(vec![], vec![]);
        let report = h
            .runner
            .run(RuleFamily::Drip, RunParams::default(), now())
            .await
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.message.as_deref(), Some("no active sequences"));
    }

    #[tokio::test]
    async fn pending_count_never_writes() {
        let rule = fixtures::rule(
            RuleFamily::AppointmentReminder,
            ChannelKind::Chat,
            "Olá {{nome}}",
        );
        let h = harness(vec![rule], vec![]);
        h.store
            .add_appointment(fixtures::appointment("a1", "p1", now() + Duration::hours(3)));

        let pending = h
            .runner
            .pending_count(RuleFamily::AppointmentReminder, RunParams::default(), now())
            .await
            .unwrap();
        assert_eq!(pending, 1);
        assert!(!h.store.appointment("a1").unwrap().reminder_sent);
        assert_eq!(h.ledger.row_count(), 0);
        assert_eq!(h.gateway.sent_count().await, 0);
    }

    #[tokio::test]
    async fn cancellation_is_honored_between_targets() {
        let rule = fixtures::rule(RuleFamily::Birthday, ChannelKind::Chat, "Parabéns {{nome}}");
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MemoryLedger::new());
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runner = JobRunner::new(
            store.clone(),
            ledger.clone(),
            vec![gateway.clone() as Arc<dyn ChannelGateway>],
            vec![rule],
            vec![],
            config(),
        )
        .with_cancellation(cancel);

        let mut patient = fixtures::patient("p1", now() - Duration::days(400));
        patient.birth_month_day = Some((6, 10));
        store.add_target(patient);

        let report = runner
            .run(RuleFamily::Birthday, RunParams::default(), now())
            .await
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.message.as_deref(), Some("run cancelled"));
        assert_eq!(gateway.sent_count().await, 0);
    }
}
