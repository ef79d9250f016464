// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `TargetStore` for engine tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curo_core::traits::TargetStore;
use curo_core::types::{AnchorField, Appointment, Target, WaitlistEntry, Window};
use curo_core::{CuroError, TargetKind};

/// A full in-memory patient or lead record.
///
/// Unlike the rule-facing [`Target`] projection, this keeps both timestamp
/// fields so window queries can pick either anchor.
#[derive(Debug, Clone)]
pub struct MemoryTarget {
    pub id: String,
    pub kind: TargetKind,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
    pub birth_month_day: Option<(u32, u32)>,
}

impl MemoryTarget {
    /// Project to a rule-facing target anchored on creation time.
    pub fn into_target(self) -> Target {
        let anchor = self.created_at;
        self.project(anchor)
    }

    fn project(&self, anchor: DateTime<Utc>) -> Target {
        Target {
            id: self.id.clone(),
            kind: self.kind,
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            status: self.status.clone(),
            anchor,
            birth_month_day: self.birth_month_day,
        }
    }
}

/// In-memory target store. All mutations are visible to later queries.
#[derive(Default)]
pub struct MemoryStore {
    targets: Mutex<Vec<MemoryTarget>>,
    appointments: Mutex<Vec<Appointment>>,
    waitlist: Mutex<Vec<WaitlistEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&self, target: MemoryTarget) {
        self.targets.lock().unwrap().push(target);
    }

    pub fn add_appointment(&self, appointment: Appointment) {
        self.appointments.lock().unwrap().push(appointment);
    }

    pub fn add_waitlist_entry(&self, entry: WaitlistEntry) {
        self.waitlist.lock().unwrap().push(entry);
    }

    /// Snapshot of a stored target, for asserting status transitions.
    pub fn target(&self, id: &str) -> Option<MemoryTarget> {
        self.targets.lock().unwrap().iter().find(|t| t.id == id).cloned()
    }

    /// Snapshot of a stored appointment.
    pub fn appointment(&self, id: &str) -> Option<Appointment> {
        self.appointments
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    async fn targets_in_window(
        &self,
        kind: TargetKind,
        field: AnchorField,
        window: &Window,
        status: Option<&str>,
    ) -> Result<Vec<Target>, CuroError> {
        let targets = self.targets.lock().unwrap();
        Ok(targets
            .iter()
            .filter(|t| t.kind == kind)
            .filter(|t| status.is_none_or(|s| t.status == s))
            .filter_map(|t| {
                let anchor = match field {
                    AnchorField::CreatedAt => Some(t.created_at),
                    AnchorField::LastActiveAt => t.last_active_at,
                }?;
                window.contains(anchor).then(|| t.project(anchor))
            })
            .collect())
    }

    async fn targets_with_birthday(&self, month: u32, day: u32) -> Result<Vec<Target>, CuroError> {
        let targets = self.targets.lock().unwrap();
        Ok(targets
            .iter()
            .filter(|t| t.kind == TargetKind::Patient)
            .filter(|t| t.birth_month_day == Some((month, day)))
            .map(|t| t.project(t.created_at))
            .collect())
    }

    async fn appointments_in_window(
        &self,
        window: &Window,
        status: &str,
    ) -> Result<Vec<Appointment>, CuroError> {
        let appointments = self.appointments.lock().unwrap();
        Ok(appointments
            .iter()
            .filter(|a| a.status == status && window.contains(a.start_time))
            .cloned()
            .collect())
    }

    async fn active_waitlist(&self) -> Result<Vec<WaitlistEntry>, CuroError> {
        let waitlist = self.waitlist.lock().unwrap();
        Ok(waitlist
            .iter()
            .filter(|e| e.status == "active")
            .cloned()
            .collect())
    }

    async fn update_target_status(
        &self,
        kind: TargetKind,
        id: &str,
        status: &str,
    ) -> Result<(), CuroError> {
        let mut targets = self.targets.lock().unwrap();
        if let Some(target) = targets.iter_mut().find(|t| t.kind == kind && t.id == id) {
            target.status = status.to_string();
        }
        Ok(())
    }

    async fn update_appointment_status(&self, id: &str, status: &str) -> Result<(), CuroError> {
        let mut appointments = self.appointments.lock().unwrap();
        if let Some(appointment) = appointments.iter_mut().find(|a| a.id == id) {
            appointment.status = status.to_string();
        }
        Ok(())
    }

    async fn append_appointment_note(&self, id: &str, note: &str) -> Result<(), CuroError> {
        let mut appointments = self.appointments.lock().unwrap();
        if let Some(appointment) = appointments.iter_mut().find(|a| a.id == id) {
            appointment.notes = Some(match appointment.notes.take() {
                Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
                _ => note.to_string(),
            });
        }
        Ok(())
    }

    async fn claim_reminder_flag(&self, appointment_id: &str) -> Result<bool, CuroError> {
        let mut appointments = self.appointments.lock().unwrap();
        match appointments.iter_mut().find(|a| a.id == appointment_id) {
            Some(a) if !a.reminder_sent => {
                a.reminder_sent = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use chrono::TimeZone;

    #[tokio::test]
    async fn window_query_picks_the_requested_anchor() {
        let store = MemoryStore::new();
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let active = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
        let mut target = fixtures::patient("p1", created);
        target.last_active_at = Some(active);
        store.add_target(target);

        let window = Window::new(active - chrono::Duration::days(1), active);
        let by_activity = store
            .targets_in_window(TargetKind::Patient, AnchorField::LastActiveAt, &window, None)
            .await
            .unwrap();
        assert_eq!(by_activity.len(), 1);
        assert_eq!(by_activity[0].anchor, active);

        let by_creation = store
            .targets_in_window(TargetKind::Patient, AnchorField::CreatedAt, &window, None)
            .await
            .unwrap();
        assert!(by_creation.is_empty());
    }

    #[tokio::test]
    async fn claim_reminder_flag_is_single_shot() {
        let store = MemoryStore::new();
        let start = Utc.with_ymd_and_hms(2026, 6, 10, 14, 0, 0).unwrap();
        store.add_appointment(fixtures::appointment("a1", "p1", start));

        assert!(store.claim_reminder_flag("a1").await.unwrap());
        assert!(!store.claim_reminder_flag("a1").await.unwrap());
        assert!(store.appointment("a1").unwrap().reminder_sent);
    }
}
