//! Electronic health record view and PDF download.

use axum::extract::State;
use axum::response::Response;
use axum::{Extension, Json};
use serde_json::{json, Value};

use super::pdf_attachment;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PatientSession};
use crate::db;
use crate::export;

/// `GET /patient/ehr`
pub async fn view(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<PatientSession>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = db::get_patient(&conn, session.patient_id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;
    let diagnoses = db::list_assessment_diagnoses(&conn, session.patient_id)?;
    Ok(Json(json!({ "patient": patient, "diagnoses": diagnoses })))
}

/// `GET /patient/ehr/download`
pub async fn download(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<PatientSession>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = db::get_patient(&conn, session.patient_id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;
    let diagnoses = db::list_assessment_diagnoses(&conn, session.patient_id)?;
    let bytes = export::ehr_pdf(&patient, &diagnoses)?;
    Ok(pdf_attachment(bytes, "ehr_record.pdf"))
}
