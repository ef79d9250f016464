// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`TargetStore`] adapter backed by the reference tables.
//!
//! Clinics with an external record system implement the trait against
//! their own backend instead; this adapter exists so a standalone
//! deployment works out of the box.

use std::sync::Arc;

use async_trait::async_trait;
use curo_core::traits::TargetStore;
use curo_core::{
    AnchorField, Appointment, CuroError, Target, TargetKind, WaitlistEntry, Window,
};

use crate::database::Database;
use crate::models::TargetRecord;
use crate::queries::targets as queries;

/// Reference target store over the local SQLite tables.
pub struct SqliteTargetStore {
    db: Arc<Database>,
}

impl SqliteTargetStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Seed a full target row. Import and test use only.
    pub async fn insert_target(&self, record: &TargetRecord) -> Result<(), CuroError> {
        queries::insert_target(&self.db, record).await
    }

    /// Seed an appointment row. Import and test use only.
    pub async fn insert_appointment(&self, appt: &Appointment) -> Result<(), CuroError> {
        queries::insert_appointment(&self.db, appt).await
    }

    /// Seed a waitlist row. Import and test use only.
    pub async fn insert_waitlist_entry(&self, entry: &WaitlistEntry) -> Result<(), CuroError> {
        queries::insert_waitlist_entry(&self.db, entry).await
    }
}

#[async_trait]
impl TargetStore for SqliteTargetStore {
    async fn targets_in_window(
        &self,
        kind: TargetKind,
        field: AnchorField,
        window: &Window,
        status: Option<&str>,
    ) -> Result<Vec<Target>, CuroError> {
        queries::targets_in_window(&self.db, kind, field, window, status).await
    }

    async fn targets_with_birthday(&self, month: u32, day: u32) -> Result<Vec<Target>, CuroError> {
        queries::targets_with_birthday(&self.db, month, day).await
    }

    async fn appointments_in_window(
        &self,
        window: &Window,
        status: &str,
    ) -> Result<Vec<Appointment>, CuroError> {
        queries::appointments_in_window(&self.db, window, status).await
    }

    async fn active_waitlist(&self) -> Result<Vec<WaitlistEntry>, CuroError> {
        queries::active_waitlist(&self.db).await
    }

    async fn update_target_status(
        &self,
        kind: TargetKind,
        id: &str,
        status: &str,
    ) -> Result<(), CuroError> {
        queries::update_target_status(&self.db, kind, id, status).await
    }

    async fn update_appointment_status(&self, id: &str, status: &str) -> Result<(), CuroError> {
        queries::update_appointment_status(&self.db, id, status).await
    }

    async fn append_appointment_note(&self, id: &str, note: &str) -> Result<(), CuroError> {
        queries::append_appointment_note(&self.db, id, note).await
    }

    async fn claim_reminder_flag(&self, appointment_id: &str) -> Result<bool, CuroError> {
        queries::claim_reminder_flag(&self.db, appointment_id).await
    }
}
