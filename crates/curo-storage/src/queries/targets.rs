// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reference-store queries over targets, appointments, and the waitlist.
//!
//! Window comparisons use `>=` / `<=` on both ends; a timestamp equal to
//! either boundary is inside the window.

use chrono::NaiveTime;
use curo_core::{
    AnchorField, Appointment, CuroError, Target, TargetKind, WaitlistEntry, Window,
};
use rusqlite::params;

use crate::database::{Database, format_ts, map_tr_err, ts_column};
use crate::models::TargetRecord;
use crate::queries::parse_col;

/// The timestamp column a window query filters on.
fn anchor_column(field: AnchorField) -> &'static str {
    match field {
        AnchorField::CreatedAt => "created_at",
        AnchorField::LastActiveAt => "last_active_at",
    }
}

fn row_to_target(row: &rusqlite::Row<'_>) -> Result<Target, rusqlite::Error> {
    let kind_raw: String = row.get(1)?;
    let anchor_raw: String = row.get(6)?;
    let birth_month: Option<u32> = row.get(7)?;
    let birth_day: Option<u32> = row.get(8)?;
    Ok(Target {
        id: row.get(0)?,
        kind: parse_col(1, &kind_raw)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        status: row.get(5)?,
        anchor: ts_column(6, &anchor_raw)?,
        birth_month_day: birth_month.zip(birth_day),
    })
}

/// Targets of `kind` whose anchor timestamp falls inside the closed window.
pub async fn targets_in_window(
    db: &Database,
    kind: TargetKind,
    field: AnchorField,
    window: &Window,
    status: Option<&str>,
) -> Result<Vec<Target>, CuroError> {
    let kind = kind.to_string();
    let col = anchor_column(field);
    let start = format_ts(window.start);
    let end = format_ts(window.end);
    let status = status.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut sql = format!(
                "SELECT id, kind, name, phone, email, status, {col}, birth_month, birth_day
                   FROM targets
                  WHERE kind = ?1 AND {col} >= ?2 AND {col} <= ?3"
            );
            if status.is_some() {
                sql.push_str(" AND status = ?4");
            }
            sql.push_str(&format!(" ORDER BY {col} ASC"));

            let mut stmt = conn.prepare(&sql)?;
            let targets = match &status {
                Some(s) => stmt
                    .query_map(params![kind, start, end, s], row_to_target)?
                    .collect::<Result<Vec<_>, _>>()?,
                None => stmt
                    .query_map(params![kind, start, end], row_to_target)?
                    .collect::<Result<Vec<_>, _>>()?,
            };
            Ok(targets)
        })
        .await
        .map_err(map_tr_err)
}

/// Patients whose stored birth month and day match. Year is never compared.
pub async fn targets_with_birthday(
    db: &Database,
    month: u32,
    day: u32,
) -> Result<Vec<Target>, CuroError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, name, phone, email, status, created_at, birth_month, birth_day
                   FROM targets
                  WHERE kind = 'patient' AND birth_month = ?1 AND birth_day = ?2
                  ORDER BY id ASC",
            )?;
            let targets = stmt
                .query_map(params![month, day], row_to_target)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(targets)
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_appointment(row: &rusqlite::Row<'_>) -> Result<Appointment, rusqlite::Error> {
    let start_raw: String = row.get(5)?;
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        start_time: ts_column(5, &start_raw)?,
        status: row.get(6)?,
        notes: row.get(7)?,
        reminder_sent: row.get(8)?,
    })
}

/// Appointments with `status` whose start time falls inside the closed window.
pub async fn appointments_in_window(
    db: &Database,
    window: &Window,
    status: &str,
) -> Result<Vec<Appointment>, CuroError> {
    let start = format_ts(window.start);
    let end = format_ts(window.end);
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, patient_id, patient_name, phone, email, start_time,
                        status, notes, reminder_sent
                   FROM appointments
                  WHERE status = ?1 AND start_time >= ?2 AND start_time <= ?3
                  ORDER BY start_time ASC",
            )?;
            let appointments = stmt
                .query_map(params![status, start, end], row_to_appointment)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(appointments)
        })
        .await
        .map_err(map_tr_err)
}

fn parse_time(idx: usize, raw: &str) -> Result<NaiveTime, rusqlite::Error> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// All waitlist entries with status `active`, oldest first.
pub async fn active_waitlist(db: &Database) -> Result<Vec<WaitlistEntry>, CuroError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, patient_id, name, phone, preferred_date, preferred_time,
                        status, created_at
                   FROM waitlist
                  WHERE status = 'active'
                  ORDER BY created_at ASC",
            )?;
            let entries = stmt
                .query_map([], |row| {
                    let date_raw: Option<String> = row.get(4)?;
                    let time_raw: Option<String> = row.get(5)?;
                    let created_raw: String = row.get(7)?;
                    Ok(WaitlistEntry {
                        id: row.get(0)?,
                        patient_id: row.get(1)?,
                        name: row.get(2)?,
                        phone: row.get(3)?,
                        preferred_date: date_raw.as_deref().map(|s| parse_col(4, s)).transpose()?,
                        preferred_time: time_raw.as_deref().map(|s| parse_time(5, s)).transpose()?,
                        status: row.get(6)?,
                        created_at: ts_column(7, &created_raw)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

/// Update a target's status field.
pub async fn update_target_status(
    db: &Database,
    kind: TargetKind,
    id: &str,
    status: &str,
) -> Result<(), CuroError> {
    let kind = kind.to_string();
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE targets SET status = ?1 WHERE id = ?2 AND kind = ?3",
                params![status, id, kind],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Update an appointment's status field.
pub async fn update_appointment_status(
    db: &Database,
    id: &str,
    status: &str,
) -> Result<(), CuroError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE appointments SET status = ?1 WHERE id = ?2",
                params![status, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Append a marker line to an appointment's notes.
pub async fn append_appointment_note(
    db: &Database,
    id: &str,
    note: &str,
) -> Result<(), CuroError> {
    let id = id.to_string();
    let note = note.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE appointments
                    SET notes = CASE
                        WHEN notes IS NULL OR notes = '' THEN ?2
                        ELSE notes || char(10) || ?2
                    END
                  WHERE id = ?1",
                params![id, note],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim the appointment's `reminder_sent` flag.
///
/// Returns `true` only for the call that flips the flag; the WHERE clause
/// makes check and set one statement.
pub async fn claim_reminder_flag(db: &Database, id: &str) -> Result<bool, CuroError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE appointments SET reminder_sent = 1
                  WHERE id = ?1 AND reminder_sent = 0",
                params![id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a full target row. Seeding and import use only.
pub async fn insert_target(db: &Database, record: &TargetRecord) -> Result<(), CuroError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO targets (id, kind, name, phone, email, status,
                                      created_at, last_active_at, birth_month, birth_day)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.kind.to_string(),
                    record.name,
                    record.phone,
                    record.email,
                    record.status,
                    format_ts(record.created_at),
                    record.last_active_at.map(format_ts),
                    record.birth_month_day.map(|(m, _)| m),
                    record.birth_month_day.map(|(_, d)| d),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Insert an appointment row. Seeding and import use only.
pub async fn insert_appointment(db: &Database, appt: &Appointment) -> Result<(), CuroError> {
    let appt = appt.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO appointments (id, patient_id, patient_name, phone, email,
                                           start_time, status, notes, reminder_sent)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    appt.id,
                    appt.patient_id,
                    appt.patient_name,
                    appt.phone,
                    appt.email,
                    format_ts(appt.start_time),
                    appt.status,
                    appt.notes,
                    appt.reminder_sent,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a waitlist row. Seeding and import use only.
pub async fn insert_waitlist_entry(
    db: &Database,
    entry: &WaitlistEntry,
) -> Result<(), CuroError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO waitlist (id, patient_id, name, phone, preferred_date,
                                       preferred_time, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.id,
                    entry.patient_id,
                    entry.name,
                    entry.phone,
                    entry.preferred_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    entry.preferred_time.map(|t| t.format("%H:%M:%S").to_string()),
                    entry.status,
                    format_ts(entry.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
