use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_doctor(conn: &Connection, doctor: &NewDoctor) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (name, email, password_hash) VALUES (?1, ?2, ?3)",
        params![doctor.name, doctor.email, doctor.password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_doctor(conn: &Connection, id: i64) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            "SELECT id, name, email, created_at FROM doctors WHERE id = ?1",
            params![id],
            |row| {
                Ok(Doctor {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(doctor)
}

pub fn find_doctor_credentials(
    conn: &Connection,
    email: &str,
) -> Result<Option<(i64, String)>, DatabaseError> {
    let creds = conn
        .query_row(
            "SELECT id, password_hash FROM doctors WHERE email = ?1",
            params![email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(creds)
}
