use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_diagnostic_report(
    conn: &Connection,
    report: &NewDiagnosticReport,
) -> Result<i64, DatabaseError> {
    let m = &report.measurements;
    conn.execute(
        "INSERT INTO diagnostic_reports
         (patient_id, doctor_id, primary_diagnosis, diagnosis_confidence,
          secondary_diagnoses, disease_probabilities, key_findings, recommendations,
          mmse_score, cdr_score, csf_tau_level, csf_abeta42_level, apoe_status,
          mri_file_path)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            report.patient_id,
            report.doctor_id,
            report.primary_diagnosis,
            report.diagnosis_confidence,
            serde_json::to_string(&report.secondary_diagnoses)?,
            serde_json::to_string(&report.disease_probabilities)?,
            serde_json::to_string(&report.key_findings)?,
            serde_json::to_string(&report.recommendations)?,
            m.mmse_score,
            m.cdr_score,
            m.csf_tau_level,
            m.csf_abeta42_level,
            m.apoe_status,
            m.mri_file_path,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_diagnostic_report(
    conn: &Connection,
    id: i64,
) -> Result<Option<DiagnosticReport>, DatabaseError> {
    let report = conn
        .query_row(
            "SELECT id, patient_id, doctor_id, primary_diagnosis, diagnosis_confidence,
                    secondary_diagnoses, disease_probabilities, key_findings, recommendations,
                    mmse_score, cdr_score, csf_tau_level, csf_abeta42_level, apoe_status,
                    mri_file_path, created_at
             FROM diagnostic_reports WHERE id = ?1",
            params![id],
            |row| {
                let secondary: Option<String> = row.get(5)?;
                let probabilities: Option<String> = row.get(6)?;
                let findings: Option<String> = row.get(7)?;
                let recommendations: Option<String> = row.get(8)?;
                Ok(DiagnosticReport {
                    id: row.get(0)?,
                    patient_id: row.get(1)?,
                    doctor_id: row.get(2)?,
                    primary_diagnosis: row.get(3)?,
                    diagnosis_confidence: row.get(4)?,
                    secondary_diagnoses: parse_stored_strings(secondary.as_deref()),
                    disease_probabilities: probabilities
                        .as_deref()
                        .and_then(|p| serde_json::from_str(p).ok())
                        .unwrap_or_default(),
                    key_findings: parse_stored_strings(findings.as_deref()),
                    recommendations: parse_stored_strings(recommendations.as_deref()),
                    measurements: ClinicalMeasurements {
                        mmse_score: row.get(9)?,
                        cdr_score: row.get(10)?,
                        csf_tau_level: row.get(11)?,
                        csf_abeta42_level: row.get(12)?,
                        apoe_status: row.get(13)?,
                        mri_file_path: row.get(14)?,
                    },
                    created_at: row.get(15)?,
                })
            },
        )
        .optional()?;
    Ok(report)
}

/// Count reports at or above / below a confidence threshold.
/// Returns `(at_or_above, below)`.
pub fn count_reports_by_confidence(
    conn: &Connection,
    threshold: f64,
) -> Result<(i64, i64), DatabaseError> {
    let counts = conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN diagnosis_confidence >= ?1 THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN diagnosis_confidence < ?1 THEN 1 ELSE 0 END), 0)
         FROM diagnostic_reports",
        params![threshold],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}
