//! Patient profile view and update.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::endpoints::auth::hash_blocking;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PatientSession};
use crate::db;
use crate::diagnostics::record_write_failure;
use crate::models::enums::AuditAction;
use crate::models::questionnaire::lenient;
use crate::models::{AuditEntry, Patient, PatientProfileUpdate};

/// Submitted profile fields; blank fields leave the stored value unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default, deserialize_with = "lenient::text")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub age: Option<i64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub blood_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub password: Option<String>,
}

impl ProfileForm {
    /// Names of the fields this submission actually changes.
    fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", self.full_name.is_some()),
            ("phone", self.phone.is_some()),
            ("age", self.age.is_some()),
            ("gender", self.gender.is_some()),
            ("blood_type", self.blood_type.is_some()),
            ("password", self.password.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

pub(crate) fn check_age(age: Option<i64>) -> Result<(), ApiError> {
    match age {
        Some(a) if !(0..=130).contains(&a) => {
            Err(ApiError::BadRequest(format!("age {a} outside 0..=130")))
        }
        _ => Ok(()),
    }
}

/// `GET /patient/profile`
pub async fn view(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<PatientSession>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = db::get_patient(&conn, session.patient_id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;
    Ok(Json(patient))
}

/// `POST /patient/profile`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<PatientSession>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<Patient>, ApiError> {
    check_age(form.age)?;
    let changed = form.changed_fields();
    let password_hash = match form.password {
        Some(password) => Some(hash_blocking(password).await?),
        None => None,
    };

    let update = PatientProfileUpdate {
        full_name: form.full_name,
        phone: form.phone,
        age: form.age,
        gender: form.gender,
        blood_type: form.blood_type,
        password_hash,
    };

    let conn = ctx.core.open_db()?;
    db::update_patient_profile(&conn, session.patient_id, &update)?;
    let patient = db::get_patient(&conn, session.patient_id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;

    // Field names only; values and credentials stay out of the log.
    let audit = AuditEntry {
        user_id: Some(session.patient_id),
        action: AuditAction::Update,
        table_name: "patients".into(),
        record_id: session.patient_id.to_string(),
        changes: json!({ "fields": changed }),
    };
    if let Err(e) = db::insert_audit_entry(&conn, &audit) {
        tracing::warn!(patient_id = session.patient_id, error = %e, "Audit append failed");
        record_write_failure(
            &conn,
            Some(session.patient_id),
            "audit_log",
            &session.patient_id,
            &e,
        );
    }

    tracing::info!(patient_id = session.patient_id, "Profile updated");
    Ok(Json(patient))
}
