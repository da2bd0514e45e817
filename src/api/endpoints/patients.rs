//! Doctor-side patient roster: search, add, pickers, latest assessment.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::auth::{email, hash_blocking, required};
use super::profile::check_age;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DoctorSession};
use crate::db;
use crate::models::questionnaire::lenient;
use crate::models::{NewPatient, PatientName};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// `GET /doctor/patients?search=`
pub async fn search(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = db::search_patients(&conn, query.search.as_deref())?;
    Ok(Json(json!({
        "patients": patients,
        "search": query.search.unwrap_or_default(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct AddPatientRequest {
    #[serde(alias = "name")]
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub age: Option<i64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub blood_type: Option<String>,
}

/// `POST /doctor/patients`
pub async fn add(
    State(ctx): State<ApiContext>,
    Extension(doctor): Extension<DoctorSession>,
    Json(req): Json<AddPatientRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let full_name = required("full_name", &req.full_name)?;
    let email = email(&req.email)?;
    check_age(req.age)?;
    let password_hash = hash_blocking(req.password).await?;

    let conn = ctx.core.open_db()?;
    let patient_id = db::insert_patient(
        &conn,
        &NewPatient {
            full_name,
            email,
            password_hash,
            phone: req.phone,
            age: req.age,
            gender: req.gender,
            blood_type: req.blood_type,
        },
    )
    .map_err(|e| {
        if e.is_unique_violation() {
            ApiError::Conflict("Email already registered".into())
        } else {
            e.into()
        }
    })?;

    tracing::info!(patient_id, doctor_id = doctor.doctor_id, "Patient added by doctor");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "created", "patient_id": patient_id })),
    ))
}

/// `GET /doctor/patients/names`
pub async fn names(State(ctx): State<ApiContext>) -> Result<Json<Vec<PatientName>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_patient_names(&conn)?))
}

/// `GET /doctor/patients/:id/latest-assessment`
pub async fn latest_assessment(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    let Some(assessment) = db::latest_assessment(&conn, patient_id)? else {
        return Ok(Json(json!({ "status": "empty" })));
    };
    Ok(Json(assessment_summary(&assessment.diag)))
}

/// Flatten a stored diagnosis blob for display. Missing or malformed
/// fields render as empty strings.
fn assessment_summary(diag: &Map<String, Value>) -> Value {
    json!({
        "status": "success",
        "primary_diagnosis": text_field(diag, "primary_diagnosis"),
        "diagnosis_confidence": diag.get("diagnosis_confidence").cloned().unwrap_or(Value::from("")),
        "secondary_diagnoses": joined_field(diag, "secondary_diagnoses"),
        "recommendations": joined_field(diag, "recommendations"),
        "key_findings": joined_field(diag, "key_findings"),
    })
}

fn text_field(diag: &Map<String, Value>, key: &str) -> String {
    diag.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn joined_field(diag: &Map<String, Value>, key: &str) -> String {
    match diag.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_stored_object;

    #[test]
    fn summary_joins_list_fields() {
        let diag = parse_stored_object(Some(
            r#"{"primary_diagnosis":"Dementia","diagnosis_confidence":0.52,
                "secondary_diagnoses":["Alzheimer's","Parkinson's"],
                "recommendations":["Consult neurologist","Schedule MRI"],
                "key_findings":["Primary risk detected: Dementia"]}"#,
        ));
        let summary = assessment_summary(&diag);
        assert_eq!(summary["status"], "success");
        assert_eq!(summary["primary_diagnosis"], "Dementia");
        assert_eq!(summary["diagnosis_confidence"], 0.52);
        assert_eq!(summary["secondary_diagnoses"], "Alzheimer's, Parkinson's");
        assert_eq!(summary["recommendations"], "Consult neurologist, Schedule MRI");
    }

    #[test]
    fn malformed_blob_renders_empty_strings() {
        let diag = parse_stored_object(Some("{broken"));
        let summary = assessment_summary(&diag);
        assert_eq!(summary["status"], "success");
        assert_eq!(summary["primary_diagnosis"], "");
        assert_eq!(summary["diagnosis_confidence"], "");
        assert_eq!(summary["key_findings"], "");
    }
}
