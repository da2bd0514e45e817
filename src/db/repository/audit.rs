use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::AuditAction;
use crate::models::*;

/// Append one entry to the audit_log table.
pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (user_id, action, table_name, record_id, changes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.user_id,
            entry.action.as_str(),
            entry.table_name,
            entry.record_id,
            serde_json::to_string(&entry.changes)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Audit trail of one record, oldest first.
pub fn audit_trail_for_record(
    conn: &Connection,
    table_name: &str,
    record_id: &str,
) -> Result<Vec<AuditRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, action, table_name, record_id, changes, created_at
         FROM audit_log
         WHERE table_name = ?1 AND record_id = ?2
         ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map(params![table_name, record_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, chrono::NaiveDateTime>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, user_id, action, table_name, record_id, changes, created_at)| {
            Ok(AuditRecord {
                id,
                user_id,
                action: AuditAction::from_str(&action)?,
                table_name,
                record_id,
                changes: parse_stored_object(changes.as_deref()),
                created_at,
            })
        })
        .collect()
}
