//! Patient and doctor landing pages.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DoctorSession, PatientSession};
use crate::db::{self, DashboardCounts};
use crate::models::{HealthEvent, PatientSummary};

const RECENT_LIMIT: u32 = 5;

/// `GET /patient/dashboard`: greeting plus the latest assessment summary.
pub async fn patient_dashboard(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<PatientSession>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = db::get_patient(&conn, session.patient_id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;
    let latest = db::latest_assessment(&conn, session.patient_id)?.map(|a| {
        json!({
            "assessment_id": a.id,
            "created_at": a.created_at,
            "risk_scores": [a.alz, a.park, a.dem],
            "diagnostic": a.diag,
        })
    });

    Ok(Json(json!({
        "patient": { "id": patient.id, "full_name": patient.full_name },
        "latest_assessment": latest,
    })))
}

#[derive(Debug, Serialize)]
pub struct DoctorDashboard {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub recent_patients: Vec<PatientSummary>,
    pub recent_events: Vec<HealthEvent>,
}

/// `GET /doctor/dashboard`
pub async fn doctor_dashboard(
    State(ctx): State<ApiContext>,
    Extension(_session): Extension<DoctorSession>,
) -> Result<Json<DoctorDashboard>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(DoctorDashboard {
        counts: db::dashboard_counts(&conn)?,
        recent_patients: db::recent_patients(&conn, RECENT_LIMIT)?,
        recent_events: db::recent_events(&conn, RECENT_LIMIT)?,
    }))
}
