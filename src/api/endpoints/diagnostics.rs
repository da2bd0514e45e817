//! Doctor diagnostics triggers.
//!
//! `/doctor/diagnostics` runs with the strict failure policy and
//! `/doctor/notes` with the lenient one. Both share one implementation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::api::types::{ApiContext, DoctorSession};
use crate::core_state::CoreError;
use crate::diagnostics::{
    placeholder_response, run_diagnostics, DiagnosticsError, DiagnosticsReport,
    DiagnosticsRequest, FailurePolicy,
};

/// Why a trigger did not produce a report.
enum Failure {
    /// Caller error, answered with 400.
    Rejected(String),
    /// Top-level failure, answered with the policy's placeholder.
    Internal(String),
}

impl From<DiagnosticsError> for Failure {
    fn from(err: DiagnosticsError) -> Self {
        match err {
            DiagnosticsError::MissingParticipant | DiagnosticsError::Form(_) => {
                Failure::Rejected(err.to_string())
            }
            DiagnosticsError::Database(e) => Failure::Internal(e.to_string()),
        }
    }
}

impl From<CoreError> for Failure {
    fn from(err: CoreError) -> Self {
        Failure::Internal(err.to_string())
    }
}

/// `POST /doctor/diagnostics`
pub async fn run_strict(
    State(ctx): State<ApiContext>,
    Extension(doctor): Extension<DoctorSession>,
    Json(body): Json<Value>,
) -> Response {
    trigger(ctx, doctor, body, FailurePolicy::Strict).await
}

/// `POST /doctor/notes`
pub async fn run_lenient(
    State(ctx): State<ApiContext>,
    Extension(doctor): Extension<DoctorSession>,
    Json(body): Json<Value>,
) -> Response {
    trigger(ctx, doctor, body, FailurePolicy::Lenient).await
}

async fn trigger(
    ctx: ApiContext,
    doctor: DoctorSession,
    body: Value,
    policy: FailurePolicy,
) -> Response {
    let request = match DiagnosticsRequest::from_value(body) {
        Ok(request) => request,
        Err(e) => return rejected(&e.to_string()),
    };
    let patient_id = request.patient_id;

    let outcome = tokio::task::spawn_blocking(move || -> Result<DiagnosticsReport, Failure> {
        let conn = ctx.core.open_db()?;
        Ok(run_diagnostics(
            &conn,
            &ctx.core.models,
            &request,
            Some(doctor.doctor_id),
            policy,
        )?)
    })
    .await;

    match outcome {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(Failure::Rejected(message))) => rejected(&message),
        Ok(Err(Failure::Internal(detail))) => placeholder(policy, patient_id, &detail),
        Err(e) => placeholder(policy, patient_id, &e.to_string()),
    }
}

fn rejected(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "message": message })),
    )
        .into_response()
}

fn placeholder(policy: FailurePolicy, patient_id: Option<i64>, detail: &str) -> Response {
    tracing::error!(?policy, patient_id, detail, "Diagnostics run failed");
    let status = match policy {
        FailurePolicy::Strict => StatusCode::INTERNAL_SERVER_ERROR,
        FailurePolicy::Lenient => StatusCode::OK,
    };
    (status, Json(placeholder_response(policy, patient_id))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseError;
    use crate::models::FormError;

    #[test]
    fn caller_errors_are_rejections() {
        assert!(matches!(
            Failure::from(DiagnosticsError::MissingParticipant),
            Failure::Rejected(m) if m == "Missing patient or doctor"
        ));
        let form = FormError::Malformed("bad".into());
        assert!(matches!(Failure::from(DiagnosticsError::Form(form)), Failure::Rejected(_)));
    }

    #[test]
    fn storage_errors_are_internal() {
        let err = DiagnosticsError::Database(DatabaseError::ConstraintViolation("fk".into()));
        assert!(matches!(Failure::from(err), Failure::Internal(_)));
    }

    #[test]
    fn placeholder_status_depends_on_policy() {
        assert_eq!(
            placeholder(FailurePolicy::Strict, Some(1), "boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            placeholder(FailurePolicy::Lenient, Some(1), "boom").status(),
            StatusCode::OK
        );
    }
}
