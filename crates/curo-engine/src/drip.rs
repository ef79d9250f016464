// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drip sequence engine.
//!
//! Walks a sequence's ordered steps for every target matched by the
//! sequence's triggers. Step state lives entirely in the delivery ledger:
//! a step is "taken" for a target once a ledger row exists for
//! (step id, target id), so catch-up is automatic. A target whose trigger
//! fired long ago receives every step it is past due for, one ledger row
//! each, paced by the dispatcher.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use curo_config::model::EngineConfig;
use curo_core::CuroError;
use curo_core::template;
use curo_core::traits::{DeliveryLedger, TargetStore};
use curo_core::types::{DeliveryStatus, DripSequence, IdempotencyScope, RunReport, Target};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatcher::{Dispatcher, SendOutcome};
use crate::eligibility::{Candidate, EligibilityResolver, MISSING_CONTACT};

/// Status a first-step send promotes a `new` lead to.
const CONTACTED: &str = "contacted";

fn step_vars(target: &Target) -> HashMap<String, String> {
    HashMap::from([
        ("nome".to_string(), target.name.clone()),
        ("name".to_string(), target.name.clone()),
    ])
}

/// Run one sequence end-to-end against its triggered targets.
///
/// Cancellation is honored between targets, never mid-send. A single
/// target's transport failure never aborts the batch; storage errors do.
pub async fn run_sequence(
    store: &dyn TargetStore,
    ledger: &dyn DeliveryLedger,
    dispatcher: &mut Dispatcher,
    config: &EngineConfig,
    sequence: &DripSequence,
    cancel: &CancellationToken,
    now: DateTime<Utc>,
) -> Result<RunReport, CuroError> {
    let mut report = RunReport::new();
    let resolver = EligibilityResolver { store, ledger };

    let mut steps = sequence.steps.clone();
    steps.sort_by_key(|s| s.order);

    let mut targets: Vec<Target> = Vec::new();
    for trigger in &sequence.triggers {
        for target in resolver.trigger_targets(*trigger, config, now).await? {
            if !targets.iter().any(|t| t.id == target.id) {
                targets.push(target);
            }
        }
    }
    debug!(sequence = %sequence.id, targets = targets.len(), "resolved sequence targets");

    for target in &targets {
        if cancel.is_cancelled() {
            info!(sequence = %sequence.id, "sequence run cancelled");
            report.message = Some("run cancelled".to_string());
            return Ok(report);
        }

        for step in &steps {
            if now - target.anchor < Duration::days(step.delay_days) {
                continue;
            }
            if !dispatcher.is_available(step.channel) {
                report.record_skipped(target, step.channel, "channel not configured");
                continue;
            }
            let candidate = Candidate::for_channel(target.clone(), step.channel);
            let Some(contact) = candidate.contact.as_deref() else {
                let reason = candidate.skip_reason.as_deref().unwrap_or(MISSING_CONTACT);
                report.record_skipped(target, step.channel, reason);
                continue;
            };
            let claimed = ledger
                .begin_attempt(
                    &step.id,
                    target.kind,
                    &target.id,
                    IdempotencyScope::Permanent,
                    now,
                )
                .await?;
            if !claimed {
                // Step already taken for this target on an earlier run.
                continue;
            }

            let text = template::render(&step.content, &step_vars(target));
            let outcome = dispatcher
                .dispatch(step.channel, &contact, step.subject.as_deref(), &text)
                .await;
            match outcome {
                SendOutcome::Delivered => {
                    ledger
                        .finish_attempt(&step.id, &target.id, DeliveryStatus::Sent, None, now)
                        .await?;
                    report.record_sent(target, step.channel);
                    if step.order == 1 && target.status == "new" {
                        store
                            .update_target_status(target.kind, &target.id, CONTACTED)
                            .await?;
                    }
                }
                SendOutcome::Rejected(reason) => {
                    ledger
                        .finish_attempt(
                            &step.id,
                            &target.id,
                            DeliveryStatus::Failed,
                            Some(&reason),
                            now,
                        )
                        .await?;
                    report.record_failed(target, step.channel, reason);
                }
            }
        }
    }

    Ok(report)
}

/// Count (target, step) pairs that are due and not yet recorded. Read-only.
pub async fn pending_steps(
    store: &dyn TargetStore,
    ledger: &dyn DeliveryLedger,
    config: &EngineConfig,
    sequence: &DripSequence,
    now: DateTime<Utc>,
) -> Result<u32, CuroError> {
    let resolver = EligibilityResolver { store, ledger };
    let mut targets: Vec<Target> = Vec::new();
    for trigger in &sequence.triggers {
        for target in resolver.trigger_targets(*trigger, config, now).await? {
            if !targets.iter().any(|t| t.id == target.id) {
                targets.push(target);
            }
        }
    }

    let mut pending = 0;
    for target in &targets {
        for step in &sequence.steps {
            if now - target.anchor < Duration::days(step.delay_days) {
                continue;
            }
            if !ledger
                .already_notified(&step.id, &target.id, IdempotencyScope::Permanent, now)
                .await?
            {
                pending += 1;
            }
        }
    }
    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use curo_core::{ChannelGateway, ChannelKind};
    use curo_test_utils::{MemoryLedger, MemoryStore, MockGateway, fixtures};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap()
    }

    fn dispatcher(gateway: Arc<MockGateway>) -> Dispatcher {
        let config = EngineConfig {
            min_send_interval_ms: 0,
            ..EngineConfig::default()
        };
        Dispatcher::new([gateway as Arc<dyn ChannelGateway>], &config)
    }

    #[tokio::test]
    async fn old_lead_catches_up_on_both_steps() {
        let store = MemoryStore::new();
        store.add_target(fixtures::lead("l1", now() - Duration::days(4)));
        let ledger = MemoryLedger::new();
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        let mut dispatcher = dispatcher(gateway.clone());

        let sequence = fixtures::drip_sequence(0, 3);
        let report = run_sequence(
            &store,
            &ledger,
            &mut dispatcher,
            &EngineConfig::default(),
            &sequence,
            &CancellationToken::new(),
            now(),
        )
        .await
        .unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(gateway.sent_count().await, 2);
        // First-step success promotes the lead.
        assert_eq!(store.target("l1").unwrap().status, "contacted");
    }

    #[tokio::test]
    async fn fresh_lead_receives_only_due_steps() {
        let store = MemoryStore::new();
        store.add_target(fixtures::lead("l1", now() - Duration::days(1)));
        let ledger = MemoryLedger::new();
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        let mut dispatcher = dispatcher(gateway.clone());

        let sequence = fixtures::drip_sequence(0, 3);
        let report = run_sequence(
            &store,
            &ledger,
            &mut dispatcher,
            &EngineConfig::default(),
            &sequence,
            &CancellationToken::new(),
            now(),
        )
        .await
        .unwrap();

        assert_eq!(report.sent, 1);
        let sent = gateway.sent_messages().await;
        assert!(sent[0].text.contains("bem-vindo"));
    }

    #[tokio::test]
    async fn lead_without_contact_is_counted_as_skipped() {
        let store = MemoryStore::new();
        let mut lead = fixtures::lead("l1", now() - Duration::days(4));
        lead.phone = None;
        store.add_target(lead);
        let ledger = MemoryLedger::new();
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        let mut dispatcher = dispatcher(gateway.clone());

        let sequence = fixtures::drip_sequence(0, 3);
        let report = run_sequence(
            &store,
            &ledger,
            &mut dispatcher,
            &EngineConfig::default(),
            &sequence,
            &CancellationToken::new(),
            now(),
        )
        .await
        .unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.details[0].reason.as_deref(), Some(MISSING_CONTACT));
        assert_eq!(ledger.row_count(), 0);
        // An unreachable lead is never promoted.
        assert_eq!(store.target("l1").unwrap().status, "new");
    }

    #[tokio::test]
    async fn second_run_sends_nothing_new() {
        let store = MemoryStore::new();
        store.add_target(fixtures::lead("l1", now() - Duration::days(4)));
        let ledger = MemoryLedger::new();
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        let mut dispatcher = dispatcher(gateway.clone());

        let sequence = fixtures::drip_sequence(0, 3);
        for _ in 0..2 {
            run_sequence(
                &store,
                &ledger,
                &mut dispatcher,
                &EngineConfig::default(),
                &sequence,
                &CancellationToken::new(),
                now(),
            )
            .await
            .unwrap();
        }

        assert_eq!(gateway.sent_count().await, 2);
        assert_eq!(ledger.row_count(), 2);
    }

    #[tokio::test]
    async fn unavailable_channel_skips_without_ledger_writes() {
        let store = MemoryStore::new();
        store.add_target(fixtures::lead("l1", now() - Duration::days(4)));
        let ledger = MemoryLedger::new();
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        gateway.set_available(false);
        let mut dispatcher = dispatcher(gateway.clone());

        let sequence = fixtures::drip_sequence(0, 3);
        let report = run_sequence(
            &store,
            &ledger,
            &mut dispatcher,
            &EngineConfig::default(),
            &sequence,
            &CancellationToken::new(),
            now(),
        )
        .await
        .unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(ledger.row_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_stops_between_targets() {
        let store = MemoryStore::new();
        store.add_target(fixtures::lead("l1", now() - Duration::days(4)));
        store.add_target(fixtures::lead("l2", now() - Duration::days(4)));
        let ledger = MemoryLedger::new();
        let gateway = Arc::new(MockGateway::new(ChannelKind::Chat));
        let mut dispatcher = dispatcher(gateway.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let sequence = fixtures::drip_sequence(0, 3);
        let report = run_sequence(
            &store,
            &ledger,
            &mut dispatcher,
            &EngineConfig::default(),
            &sequence,
            &cancel,
            now(),
        )
        .await
        .unwrap();

        assert_eq!(report.processed, 0);
        assert_eq!(report.message.as_deref(), Some("run cancelled"));
        assert_eq!(gateway.sent_count().await, 0);
    }

    #[tokio::test]
    async fn pending_counts_due_unrecorded_pairs() {
        let store = MemoryStore::new();
        store.add_target(fixtures::lead("l1", now() - Duration::days(4)));
        store.add_target(fixtures::lead("l2", now() - Duration::days(1)));
        let ledger = MemoryLedger::new();

        let sequence = fixtures::drip_sequence(0, 3);
        let config = EngineConfig::default();
        // l1 is due for both steps, l2 only for the first.
        let pending = pending_steps(&store, &ledger, &config, &sequence, now())
            .await
            .unwrap();
        assert_eq!(pending, 3);
        assert_eq!(ledger.row_count(), 0);
    }
}
