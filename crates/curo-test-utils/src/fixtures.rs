// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture builders shared by engine and integration tests.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use curo_core::types::{
    Appointment, DripSequence, NotificationRule, SequenceStep, WaitlistEntry,
};
use curo_core::{ChannelKind, RuleFamily, TriggerKind};

use crate::memory_store::MemoryTarget;

/// A patient with a phone contact, created at `created_at`.
pub fn patient(id: &str, created_at: DateTime<Utc>) -> MemoryTarget {
    MemoryTarget {
        id: id.to_string(),
        kind: curo_core::TargetKind::Patient,
        name: format!("Patient {id}"),
        phone: Some("11 99999-0000".to_string()),
        email: Some(format!("{id}@example.com")),
        status: "active".to_string(),
        created_at,
        last_active_at: None,
        birth_month_day: None,
    }
}

/// A lead with status `new`, created at `created_at`.
pub fn lead(id: &str, created_at: DateTime<Utc>) -> MemoryTarget {
    MemoryTarget {
        id: id.to_string(),
        kind: curo_core::TargetKind::Lead,
        name: format!("Lead {id}"),
        phone: Some("11 98888-0000".to_string()),
        email: None,
        status: "new".to_string(),
        created_at,
        last_active_at: None,
        birth_month_day: None,
    }
}

/// A scheduled appointment with a phone contact.
pub fn appointment(id: &str, patient_id: &str, start_time: DateTime<Utc>) -> Appointment {
    Appointment {
        id: id.to_string(),
        patient_id: patient_id.to_string(),
        patient_name: format!("Patient {patient_id}"),
        phone: Some("11 97777-0000".to_string()),
        email: None,
        start_time,
        status: "scheduled".to_string(),
        notes: None,
        reminder_sent: false,
    }
}

/// An active notification rule for `family` on `channel`.
pub fn rule(family: RuleFamily, channel: ChannelKind, template: &str) -> NotificationRule {
    NotificationRule {
        id: format!("rule-{family}"),
        family,
        channel,
        template: template.to_string(),
        active: true,
    }
}

/// A two-step chat drip sequence on the `new_lead` trigger.
pub fn drip_sequence(step1_delay: i64, step2_delay: i64) -> DripSequence {
    DripSequence {
        id: "seq-1".to_string(),
        name: "lead nurturing".to_string(),
        steps: vec![
            SequenceStep {
                id: "seq-1-step-1".to_string(),
                order: 1,
                delay_days: step1_delay,
                channel: ChannelKind::Chat,
                content: "Olá {{nome}}, bem-vindo!".to_string(),
                subject: None,
            },
            SequenceStep {
                id: "seq-1-step-2".to_string(),
                order: 2,
                delay_days: step2_delay,
                channel: ChannelKind::Chat,
                content: "Oi {{nome}}, ainda tem interesse?".to_string(),
                subject: None,
            },
        ],
        triggers: vec![TriggerKind::NewLead],
        active: true,
    }
}

/// An active waitlist entry.
pub fn waitlist_entry(
    id: &str,
    created_at: DateTime<Utc>,
    preferred_date: Option<NaiveDate>,
    preferred_time: Option<NaiveTime>,
) -> WaitlistEntry {
    WaitlistEntry {
        id: id.to_string(),
        patient_id: Some(format!("p-{id}")),
        name: format!("Waitlisted {id}"),
        phone: Some("11 96666-0000".to_string()),
        preferred_date,
        preferred_time,
        status: "active".to_string(),
        created_at,
    }
}
