use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str =
    "id, full_name, email, phone, age, gender, blood_type, created_at";

fn row_to_patient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        age: row.get(4)?,
        gender: row.get(5)?,
        blood_type: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientSummary> {
    Ok(PatientSummary {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        age: row.get(3)?,
        gender: row.get(4)?,
    })
}

pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (full_name, email, password_hash, phone, age, gender, blood_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            patient.full_name,
            patient.email,
            patient.password_hash,
            patient.phone,
            patient.age,
            patient.gender,
            patient.blood_type,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id],
            row_to_patient,
        )
        .optional()?;
    Ok(patient)
}

/// Look up `(id, password_hash)` for a login attempt.
pub fn find_patient_credentials(
    conn: &Connection,
    email: &str,
) -> Result<Option<(i64, String)>, DatabaseError> {
    let creds = conn
        .query_row(
            "SELECT id, password_hash FROM patients WHERE email = ?1",
            params![email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(creds)
}

/// Apply a profile update. Absent fields keep their stored value.
pub fn update_patient_profile(
    conn: &Connection,
    id: i64,
    update: &PatientProfileUpdate,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET
            full_name = COALESCE(?1, full_name),
            phone = COALESCE(?2, phone),
            age = COALESCE(?3, age),
            gender = COALESCE(?4, gender),
            blood_type = COALESCE(?5, blood_type),
            password_hash = COALESCE(?6, password_hash)
         WHERE id = ?7",
        params![
            update.full_name,
            update.phone,
            update.age,
            update.gender,
            update.blood_type,
            update.password_hash,
            id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Newest-first patient list, optionally filtered by a name/email substring.
pub fn search_patients(
    conn: &Connection,
    search: Option<&str>,
) -> Result<Vec<PatientSummary>, DatabaseError> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let rows = match search {
        Some(term) => {
            let pattern = format!("%{term}%");
            let mut stmt = conn.prepare(
                "SELECT id, full_name, email, age, gender FROM patients
                 WHERE full_name LIKE ?1 OR email LIKE ?1
                 ORDER BY id DESC",
            )?;
            let rows = stmt
                .query_map(params![pattern], row_to_summary)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, full_name, email, age, gender FROM patients ORDER BY id DESC",
            )?;
            let rows = stmt
                .query_map([], row_to_summary)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

pub fn recent_patients(conn: &Connection, limit: u32) -> Result<Vec<PatientSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, email, age, gender FROM patients ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], row_to_summary)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Named patients ordered alphabetically, for pickers.
pub fn list_patient_names(conn: &Connection) -> Result<Vec<PatientName>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name FROM patients
         WHERE full_name IS NOT NULL AND full_name != ''
         ORDER BY full_name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PatientName {
                id: row.get(0)?,
                full_name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
    Ok(count)
}
