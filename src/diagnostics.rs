//! Doctor-triggered diagnostics: run the models, persist the report, then
//! append the timeline event and audit entry.
//!
//! The report insert is the primary write. The event and audit appends are
//! best-effort: a failure is logged, a compensating `WRITE_FAILED` audit
//! entry is attempted, and the report is still returned.

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::db::{self, DatabaseError};
use crate::inference::{DiagnosticResult, ModelManager};
use crate::models::enums::{AuditAction, EventType, Severity};
use crate::models::questionnaire::lenient;
use crate::models::{
    AuditEntry, ClinicalMeasurements, FormError, NewDiagnosticReport, NewHealthEvent,
    QuestionnaireForm,
};

pub const PENDING_DIAGNOSIS: &str = "Pending Medical Evaluation";
const PLACEHOLDER_CONFIDENCE: f64 = 0.5;

/// How a diagnostics trigger reacts to a failed report insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Report insert failure aborts the run.
    Strict,
    /// Report insert failure yields a `temp_<ts>` id and the run continues.
    Lenient,
}

impl FailurePolicy {
    fn severity(&self, confidence: f64) -> Severity {
        let high = match self {
            FailurePolicy::Strict => confidence >= 0.7,
            FailurePolicy::Lenient => confidence > 0.7,
        };
        if high {
            Severity::High
        } else {
            Severity::Moderate
        }
    }

    fn event_description(&self, diagnosis: &str) -> String {
        match self {
            FailurePolicy::Strict => format!("Primary diagnosis confirmed: {diagnosis}"),
            FailurePolicy::Lenient => format!("Primary diagnosis: {diagnosis}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DiagnosticsError {
    #[error("Missing patient or doctor")]
    MissingParticipant,

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Request body of a diagnostics trigger. Ids and measurements arrive
/// as numbers or numeric strings; every other field is questionnaire input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticsRequest {
    #[serde(default, deserialize_with = "lenient::integer")]
    pub patient_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub doctor_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub mmse_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub cdr_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub csf_tau_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub csf_abeta42_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub apoe_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub mri_file_path: Option<String>,
    #[serde(flatten)]
    pub form: QuestionnaireForm,
}

impl DiagnosticsRequest {
    pub fn from_value(body: Value) -> Result<Self, FormError> {
        serde_json::from_value(body).map_err(|e| FormError::Malformed(e.to_string()))
    }

    fn measurements(&self) -> ClinicalMeasurements {
        ClinicalMeasurements {
            mmse_score: self.mmse_score,
            cdr_score: self.cdr_score,
            csf_tau_level: self.csf_tau_level,
            csf_abeta42_level: self.csf_abeta42_level,
            apoe_status: self.apoe_status.clone(),
            mri_file_path: self.mri_file_path.clone(),
        }
    }
}

/// Row id of the stored report, or a placeholder when it could not be stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportId {
    Stored(i64),
    Temporary(String),
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportId::Stored(id) => write!(f, "{id}"),
            ReportId::Temporary(tag) => f.write_str(tag),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub status: &'static str,
    pub report_id: ReportId,
    pub patient_id: i64,
    #[serde(flatten)]
    pub diagnostic: DiagnosticResult,
    pub timestamp: String,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn run_diagnostics(
    conn: &Connection,
    models: &ModelManager,
    request: &DiagnosticsRequest,
    session_doctor: Option<i64>,
    policy: FailurePolicy,
) -> Result<DiagnosticsReport, DiagnosticsError> {
    let positive = |id: Option<i64>| id.filter(|&v| v > 0);
    let (Some(patient_id), Some(doctor_id)) = (
        positive(request.patient_id),
        positive(request.doctor_id).or(positive(session_doctor)),
    ) else {
        return Err(DiagnosticsError::MissingParticipant);
    };
    request.form.validate()?;

    let diagnostic = models.predict_diagnostic(&request.form).unwrap_or_else(|e| {
        tracing::warn!(patient_id, error = %e, "Diagnostic prediction failed, using fallback");
        models.fallback_diagnostic(&request.form)
    });

    let report = NewDiagnosticReport {
        patient_id,
        doctor_id,
        primary_diagnosis: diagnostic.primary_diagnosis.clone(),
        diagnosis_confidence: diagnostic.diagnosis_confidence,
        secondary_diagnoses: diagnostic.secondary_diagnoses.clone(),
        disease_probabilities: diagnostic.disease_probabilities.clone(),
        key_findings: diagnostic.key_findings.clone(),
        recommendations: diagnostic.recommendations.clone(),
        measurements: request.measurements(),
    };
    let report_id = match db::insert_diagnostic_report(conn, &report) {
        Ok(id) => ReportId::Stored(id),
        Err(e) if policy == FailurePolicy::Lenient => {
            tracing::warn!(patient_id, error = %e, "Diagnostic report insert failed");
            ReportId::Temporary(format!("temp_{}", Utc::now().timestamp()))
        }
        Err(e) => return Err(e.into()),
    };

    let event = NewHealthEvent {
        patient_id,
        event_type: EventType::Diagnosis,
        title: format!("Diagnostic Report: {}", diagnostic.primary_diagnosis),
        description: policy.event_description(&diagnostic.primary_diagnosis),
        severity: policy.severity(diagnostic.diagnosis_confidence),
        disease: Some(diagnostic.primary_diagnosis.clone()),
    };
    if let Err(e) = db::insert_health_event(conn, &event) {
        tracing::warn!(patient_id, %report_id, error = %e, "Health event append failed");
        record_write_failure(conn, Some(doctor_id), "health_events", &report_id, &e);
    }

    let audit = AuditEntry {
        user_id: Some(doctor_id),
        action: AuditAction::Create,
        table_name: "diagnostic_reports".into(),
        record_id: report_id.to_string(),
        changes: json!({ "diagnosis": diagnostic.primary_diagnosis }),
    };
    if let Err(e) = db::insert_audit_entry(conn, &audit) {
        tracing::warn!(patient_id, %report_id, error = %e, "Audit append failed");
        record_write_failure(conn, Some(doctor_id), "audit_log", &report_id, &e);
    }

    tracing::info!(
        patient_id,
        doctor_id,
        %report_id,
        diagnosis = %diagnostic.primary_diagnosis,
        confidence = diagnostic.diagnosis_confidence,
        "Diagnostics completed"
    );

    Ok(DiagnosticsReport {
        status: "success",
        report_id,
        patient_id,
        diagnostic,
        timestamp: timestamp(),
    })
}

/// Compensating audit entry for a failed append. Itself best-effort.
pub fn record_write_failure(
    conn: &Connection,
    user_id: Option<i64>,
    table: &str,
    record_id: &impl std::fmt::Display,
    error: &DatabaseError,
) {
    let entry = AuditEntry {
        user_id,
        action: AuditAction::WriteFailed,
        table_name: table.to_string(),
        record_id: record_id.to_string(),
        changes: json!({ "error": error.to_string() }),
    };
    if let Err(e) = db::insert_audit_entry(conn, &entry) {
        tracing::warn!(table, error = %e, "Compensating audit entry failed");
    }
}

/// Body returned when the run could not complete.
pub fn placeholder_response(policy: FailurePolicy, patient_id: Option<i64>) -> Value {
    let now = Utc::now();
    match policy {
        FailurePolicy::Strict => json!({
            "status": "error",
            "report_id": null,
            "primary_diagnosis": PENDING_DIAGNOSIS,
            "diagnosis_confidence": PLACEHOLDER_CONFIDENCE,
            "recommendations": ["Consult a healthcare professional"],
            "timestamp": now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }),
        FailurePolicy::Lenient => json!({
            "report_id": format!("error_{}", now.timestamp()),
            "patient_id": patient_id,
            "primary_diagnosis": PENDING_DIAGNOSIS,
            "diagnosis_confidence": PLACEHOLDER_CONFIDENCE,
            "secondary_diagnoses": [],
            "disease_probabilities": { "pending": 1.0 },
            "key_findings": ["Requires additional clinical evaluation"],
            "recommendations": ["Consult your healthcare provider"],
            "timestamp": now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }),
    }
}
