//! Doctor intervention log.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::required;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DoctorSession};
use crate::db;
use crate::diagnostics::record_write_failure;
use crate::models::enums::{AuditAction, EventType, Severity};
use crate::models::questionnaire::lenient;
use crate::models::{AuditEntry, NewHealthEvent};

const RECENT_INTERVENTIONS: u32 = 10;

/// `GET /doctor/interventions`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(json!({
        "patients": db::list_patient_names(&conn)?,
        "interventions": db::recent_interventions(&conn, RECENT_INTERVENTIONS)?,
    })))
}

#[derive(Debug, Deserialize)]
pub struct InterventionRequest {
    #[serde(default, deserialize_with = "lenient::integer")]
    pub patient_id: Option<i64>,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub intervention_type: String,
    #[serde(default)]
    pub details: String,
}

/// `POST /doctor/interventions`
pub async fn record(
    State(ctx): State<ApiContext>,
    Extension(doctor): Extension<DoctorSession>,
    Json(req): Json<InterventionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let patient_id = req
        .patient_id
        .filter(|&id| id > 0)
        .ok_or_else(|| ApiError::BadRequest("patient_id is required".into()))?;
    let intervention_type = required("intervention_type", &req.intervention_type)?;
    let diagnosis = req.diagnosis.trim();

    let conn = ctx.core.open_db()?;
    if db::get_patient(&conn, patient_id)?.is_none() {
        return Err(ApiError::NotFound(format!("Patient {patient_id} not found")));
    }

    let event_id = db::insert_health_event(
        &conn,
        &NewHealthEvent {
            patient_id,
            event_type: EventType::Intervention,
            title: format!("{intervention_type} Intervention"),
            description: req.details.trim().to_string(),
            severity: Severity::Moderate,
            disease: (!diagnosis.is_empty()).then(|| diagnosis.to_string()),
        },
    )?;

    let audit = AuditEntry {
        user_id: Some(doctor.doctor_id),
        action: AuditAction::Create,
        table_name: "health_events".into(),
        record_id: event_id.to_string(),
        changes: json!({ "intervention_type": intervention_type, "patient_id": patient_id }),
    };
    if let Err(e) = db::insert_audit_entry(&conn, &audit) {
        tracing::warn!(event_id, error = %e, "Audit append failed");
        record_write_failure(&conn, Some(doctor.doctor_id), "audit_log", &event_id, &e);
    }

    tracing::info!(patient_id, doctor_id = doctor.doctor_id, event_id, "Intervention logged");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "created", "event_id": event_id })),
    ))
}
