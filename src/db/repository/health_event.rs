use std::str::FromStr;

use rusqlite::{params, params_from_iter, Connection};

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

pub fn insert_health_event(conn: &Connection, event: &NewHealthEvent) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO health_events (patient_id, event_type, title, description, severity, disease)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.patient_id,
            event.event_type.as_str(),
            event.title,
            event.description,
            event.severity.as_str(),
            event.disease,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

type EventRow = (i64, i64, String, String, String, String, Option<String>, chrono::NaiveDateTime);

fn read_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn event_rows_to_vec(rows: Vec<EventRow>) -> Result<Vec<HealthEvent>, DatabaseError> {
    rows.into_iter()
        .map(|(id, patient_id, event_type, title, description, severity, disease, created_at)| {
            Ok(HealthEvent {
                id,
                patient_id,
                event_type: EventType::from_str(&event_type)?,
                title,
                description,
                severity: Severity::from_str(&severity)?,
                disease,
                created_at,
            })
        })
        .collect()
}

/// Timeline of one patient, newest first, with optional type/disease filters.
pub fn list_patient_events(
    conn: &Connection,
    patient_id: i64,
    filter: &HealthEventFilter,
) -> Result<Vec<HealthEvent>, DatabaseError> {
    let mut sql = String::from(
        "SELECT id, patient_id, event_type, title, description, severity, disease, created_at
         FROM health_events WHERE patient_id = ?",
    );
    let mut values: Vec<rusqlite::types::Value> = vec![patient_id.into()];

    if let Some(event_type) = &filter.event_type {
        sql.push_str(" AND event_type = ?");
        values.push(event_type.as_str().to_string().into());
    }
    if let Some(disease) = &filter.disease {
        sql.push_str(" AND disease = ?");
        values.push(disease.clone().into());
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), read_event_row)?
        .collect::<Result<Vec<_>, _>>()?;
    event_rows_to_vec(rows)
}

/// Most recent events across all patients (dashboard activity feed).
pub fn recent_events(conn: &Connection, limit: u32) -> Result<Vec<HealthEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, event_type, title, description, severity, disease, created_at
         FROM health_events ORDER BY created_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], read_event_row)?
        .collect::<Result<Vec<_>, _>>()?;
    event_rows_to_vec(rows)
}

pub fn recent_interventions(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<InterventionEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT he.id, p.full_name, he.title, he.description, he.disease, he.created_at
         FROM health_events he
         JOIN patients p ON he.patient_id = p.id
         WHERE he.event_type = 'intervention'
         ORDER BY he.created_at DESC, he.id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(InterventionEntry {
                id: row.get(0)?,
                patient_name: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                disease: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_events_by_severity(conn: &Connection, severity: Severity) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM health_events WHERE severity = ?1",
        params![severity.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}
