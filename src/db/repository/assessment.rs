use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_assessment(conn: &Connection, assessment: &NewAssessment) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO assessments (patient_id, form_data, alz, park, dem, diag)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            assessment.patient_id,
            serde_json::to_string(&assessment.form)?,
            serde_json::to_string(&assessment.alz)?,
            serde_json::to_string(&assessment.park)?,
            serde_json::to_string(&assessment.dem)?,
            serde_json::to_string(&assessment.diag)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Diagnosis blobs of every assessment for a patient, newest first.
pub fn list_assessment_diagnoses(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<AssessmentDiagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT diag, created_at FROM assessments
         WHERE patient_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt
        .query_map(params![patient_id], |row| {
            let diag: Option<String> = row.get(0)?;
            Ok(AssessmentDiagnosis {
                diag: parse_stored_object(diag.as_deref()),
                created_at: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn latest_assessment(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<StoredAssessment>, DatabaseError> {
    let assessment = conn
        .query_row(
            "SELECT id, patient_id, form_data, alz, park, dem, diag, created_at
             FROM assessments
             WHERE patient_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
            params![patient_id],
            |row| {
                let form_data: Option<String> = row.get(2)?;
                let alz: Option<String> = row.get(3)?;
                let park: Option<String> = row.get(4)?;
                let dem: Option<String> = row.get(5)?;
                let diag: Option<String> = row.get(6)?;
                Ok(StoredAssessment {
                    id: row.get(0)?,
                    patient_id: row.get(1)?,
                    form_data: parse_stored_object(form_data.as_deref()),
                    alz: parse_stored_object(alz.as_deref()),
                    park: parse_stored_object(park.as_deref()),
                    dem: parse_stored_object(dem.as_deref()),
                    diag: parse_stored_object(diag.as_deref()),
                    created_at: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(assessment)
}
