//! Four-step patient questionnaire.
//!
//! Each POST merges the submitted answers into the session draft. The
//! fourth step runs the risk models, stores the assessment and clears the
//! draft.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PatientSession};
use crate::db;
use crate::diagnostics::record_write_failure;
use crate::inference::{AssessmentOutcome, RiskLevel};
use crate::models::enums::{AuditAction, EventType, Severity};
use crate::models::questionnaire::QUESTIONNAIRE_STEPS;
use crate::models::{AuditEntry, NewAssessment, NewHealthEvent, QuestionnaireForm};

#[derive(Debug, Default, Deserialize)]
pub struct StepQuery {
    pub step: Option<String>,
}

impl StepQuery {
    /// Requested step; absent or blank means the first.
    fn step(&self) -> Result<u8, ApiError> {
        let raw = match self.step.as_deref().map(str::trim) {
            None | Some("") => return Ok(1),
            Some(raw) => raw,
        };
        raw.parse::<u8>()
            .ok()
            .filter(|s| (1..=QUESTIONNAIRE_STEPS).contains(s))
            .ok_or_else(|| {
                ApiError::BadRequest(format!("step must be 1..={QUESTIONNAIRE_STEPS}, got {raw}"))
            })
    }
}

fn with_draft<T>(
    ctx: &ApiContext,
    session: &PatientSession,
    f: impl FnOnce(&mut Map<String, Value>) -> T,
) -> Result<T, ApiError> {
    let mut store = ctx
        .sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock".into()))?;
    let entry = store.touch(&session.token_hash).ok_or(ApiError::LoginRequired {
        login_path: "/patient/login",
    })?;
    Ok(f(&mut entry.draft))
}

/// `GET /patient/assessment?step=n`
pub async fn current(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<PatientSession>,
    Query(query): Query<StepQuery>,
) -> Result<Json<Value>, ApiError> {
    let step = query.step()?;
    let draft = with_draft(&ctx, &session, |draft| draft.clone())?;
    Ok(Json(json!({
        "step": step,
        "total_steps": QUESTIONNAIRE_STEPS,
        "draft": draft,
    })))
}

/// `POST /patient/assessment?step=n`
pub async fn submit(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<PatientSession>,
    Query(query): Query<StepQuery>,
    Json(answers): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let step = query.step()?;
    let Value::Object(answers) = answers else {
        return Err(ApiError::BadRequest("answers must be a JSON object".into()));
    };

    let draft = with_draft(&ctx, &session, |draft| {
        draft.extend(answers);
        draft.clone()
    })?;

    if step < QUESTIONNAIRE_STEPS {
        return Ok(Json(json!({ "status": "continue", "next_step": step + 1 })));
    }

    let form = QuestionnaireForm::from_draft(&draft)?;
    form.validate()?;

    let models = ctx.core.models.clone();
    let scoring_form = form.clone();
    let outcome = tokio::task::spawn_blocking(move || models.assess(&scoring_form)).await?;

    let assessment_id = store_assessment(&ctx, session.patient_id, form, &outcome)?;
    with_draft(&ctx, &session, Map::clear)?;

    let AssessmentOutcome {
        alzheimers,
        parkinsons,
        dementia,
        diagnostic,
    } = outcome;
    Ok(Json(json!({
        "status": "complete",
        "assessment_id": assessment_id,
        "risk_scores": [alzheimers, parkinsons, dementia],
        "diagnostic": diagnostic,
    })))
}

/// Insert the assessment, then append its timeline event and audit entry.
fn store_assessment(
    ctx: &ApiContext,
    patient_id: i64,
    form: QuestionnaireForm,
    outcome: &AssessmentOutcome,
) -> Result<i64, ApiError> {
    let conn = ctx.core.open_db()?;
    let assessment_id = db::insert_assessment(
        &conn,
        &NewAssessment {
            patient_id,
            form,
            alz: outcome.alzheimers.clone(),
            park: outcome.parkinsons.clone(),
            dem: outcome.dementia.clone(),
            diag: outcome.diagnostic.clone(),
        },
    )?;

    let primary = &outcome.diagnostic.primary_diagnosis;
    let event = NewHealthEvent {
        patient_id,
        event_type: EventType::Assessment,
        title: "Risk Assessment Completed".into(),
        description: format!(
            "Primary risk: {primary} ({:.0}% confidence)",
            outcome.diagnostic.diagnosis_confidence * 100.0
        ),
        severity: assessment_severity(outcome),
        disease: Some(primary.clone()),
    };
    if let Err(e) = db::insert_health_event(&conn, &event) {
        tracing::warn!(patient_id, assessment_id, error = %e, "Assessment event append failed");
        record_write_failure(&conn, None, "health_events", &assessment_id, &e);
    }

    let audit = AuditEntry {
        user_id: None,
        action: AuditAction::Create,
        table_name: "assessments".into(),
        record_id: assessment_id.to_string(),
        changes: json!({ "patient_id": patient_id, "primary_diagnosis": primary }),
    };
    if let Err(e) = db::insert_audit_entry(&conn, &audit) {
        tracing::warn!(patient_id, assessment_id, error = %e, "Audit append failed");
        record_write_failure(&conn, None, "audit_log", &assessment_id, &e);
    }

    tracing::info!(patient_id, assessment_id, primary = %primary, "Assessment completed");
    Ok(assessment_id)
}

/// Worst risk level across the three predictions.
fn assessment_severity(outcome: &AssessmentOutcome) -> Severity {
    let levels = [
        outcome.alzheimers.risk_level,
        outcome.parkinsons.risk_level,
        outcome.dementia.risk_level,
    ];
    if levels.contains(&RiskLevel::High) {
        Severity::High
    } else if levels.contains(&RiskLevel::Moderate) {
        Severity::Moderate
    } else {
        Severity::Low
    }
}
