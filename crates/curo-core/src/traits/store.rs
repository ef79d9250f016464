// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Target store trait: read/update access to the external clinic records.
//!
//! The engine never owns patients, leads, appointments, or waitlist
//! entries; it queries projections of them and writes back the few status
//! transitions the automation rules mandate.

use async_trait::async_trait;

use crate::error::CuroError;
use crate::types::{AnchorField, Appointment, Target, TargetKind, WaitlistEntry, Window};

/// External store of patients, leads, appointments, and waitlist entries.
///
/// Any storage error aborts the whole rule run; no partial candidate list
/// is ever used.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Targets of `kind` whose `field` timestamp falls inside the closed
    /// `window`, optionally filtered by status.
    async fn targets_in_window(
        &self,
        kind: TargetKind,
        field: AnchorField,
        window: &Window,
        status: Option<&str>,
    ) -> Result<Vec<Target>, CuroError>;

    /// Patients whose birthday matches the given month and day. Year is
    /// ignored by contract.
    async fn targets_with_birthday(&self, month: u32, day: u32) -> Result<Vec<Target>, CuroError>;

    /// Appointments with `status` whose start time falls inside `window`.
    async fn appointments_in_window(
        &self,
        window: &Window,
        status: &str,
    ) -> Result<Vec<Appointment>, CuroError>;

    /// All waitlist entries with status `active`.
    async fn active_waitlist(&self) -> Result<Vec<WaitlistEntry>, CuroError>;

    /// Update a target's status field (e.g. lead `new` -> `contacted`).
    async fn update_target_status(
        &self,
        kind: TargetKind,
        id: &str,
        status: &str,
    ) -> Result<(), CuroError>;

    /// Update an appointment's status field (e.g. `scheduled` -> `no_show`).
    async fn update_appointment_status(&self, id: &str, status: &str) -> Result<(), CuroError>;

    /// Append a marker line to an appointment's notes.
    async fn append_appointment_note(&self, id: &str, note: &str) -> Result<(), CuroError>;

    /// Atomically claim the appointment's `reminder_sent` flag.
    ///
    /// Returns `true` if this call flipped the flag from unset to set;
    /// `false` if it was already set. This is the boolean-flag idempotency
    /// representation used by single-shot appointment reminders.
    async fn claim_reminder_flag(&self, appointment_id: &str) -> Result<bool, CuroError>;
}
