//! Portal router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes fall into four groups by guard:
//!
//! 1. Public: health, signup, login, logout
//! 2. Patient pages: `require_patient` (redirect to `/patient/login`)
//! 3. Doctor pages: `require_doctor` (redirect to `/doctor/login`)
//! 4. Doctor JSON: `require_doctor_json` (401)
//!
//! Every group shares the access log, `Cache-Control: no-store` and the
//! `ApiContext` extension.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the portal router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn portal_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);
    build_router(ctx)
}

/// Build router from a pre-constructed `ApiContext`, so tests can reach
/// the session store.
#[cfg(test)]
pub(crate) fn portal_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    let max_upload = ctx.core.config.max_upload_bytes;

    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/patient/signup", post(endpoints::auth::patient_signup))
        .route("/patient/login", post(endpoints::auth::patient_login))
        .route("/doctor/register", post(endpoints::auth::doctor_register))
        .route("/doctor/login", post(endpoints::auth::doctor_login))
        .route("/logout", post(endpoints::auth::logout))
        .with_state(ctx.clone());

    let patient = Router::new()
        .route("/patient/dashboard", get(endpoints::dashboard::patient_dashboard))
        .route(
            "/patient/profile",
            get(endpoints::profile::view).post(endpoints::profile::update),
        )
        .route(
            "/patient/assessment",
            get(endpoints::assessment::current).post(endpoints::assessment::submit),
        )
        .route("/patient/timeline", get(endpoints::timeline::list))
        .route("/patient/timeline/export", get(endpoints::timeline::export_pdf))
        .route("/patient/ehr", get(endpoints::ehr::view))
        .route("/patient/ehr/download", get(endpoints::ehr::download))
        .with_state(ctx.clone())
        .route_layer(axum::middleware::from_fn(middleware::session::require_patient));

    let doctor = Router::new()
        .route("/doctor/dashboard", get(endpoints::dashboard::doctor_dashboard))
        .route(
            "/doctor/patients",
            get(endpoints::patients::search).post(endpoints::patients::add),
        )
        .route("/doctor/patients/names", get(endpoints::patients::names))
        .route("/doctor/diagnostics", post(endpoints::diagnostics::run_strict))
        .route("/doctor/notes", post(endpoints::diagnostics::run_lenient))
        .route(
            "/doctor/interventions",
            get(endpoints::interventions::list).post(endpoints::interventions::record),
        )
        .with_state(ctx.clone())
        .route_layer(axum::middleware::from_fn(middleware::session::require_doctor));

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let doctor_json = Router::new()
        .route("/models/status", get(endpoints::health::model_status))
        .route(
            "/doctor/patients/:id/latest-assessment",
            get(endpoints::patients::latest_assessment),
        )
        .route(
            "/doctor/mri",
            post(endpoints::uploads::upload_mri).layer(DefaultBodyLimit::max(max_upload)),
        )
        .with_state(ctx.clone())
        .route_layer(axum::middleware::from_fn(middleware::session::require_doctor_json));

    // Layers are applied from bottom (innermost) to top (outermost).
    // Extension must be outermost so the session guards can extract ApiContext.
    Router::new()
        .merge(public)
        .merge(patient)
        .merge(doctor)
        .merge(doctor_json)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(axum::Extension(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::PortalConfig;
    use crate::inference::ModelManager;

    fn test_core() -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let core = CoreState::new(
            PortalConfig::rooted_at(tmp.path()),
            Arc::new(ModelManager::heuristic_only()),
        );
        core.initialize().unwrap();
        (Arc::new(core), tmp)
    }

    fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// `name=value` pair from the Set-Cookie header.
    fn cookie_of(response: &Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    async fn patient_cookie(app: &Router) -> String {
        let signup = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/patient/signup",
                None,
                json!({"name": "Ada Byron", "email": "ada@example.org", "password": "pw-123"}),
            ))
            .await
            .unwrap();
        assert_eq!(signup.status(), StatusCode::CREATED);

        let login = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/patient/login",
                None,
                json!({"email": "ADA@example.org", "password": "pw-123"}),
            ))
            .await
            .unwrap();
        assert_eq!(login.status(), StatusCode::OK);
        cookie_of(&login)
    }

    async fn doctor_cookie(app: &Router) -> String {
        let register = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/doctor/register",
                None,
                json!({"name": "Dr. Hale", "email": "hale@clinic.org", "password": "pw-456"}),
            ))
            .await
            .unwrap();
        assert_eq!(register.status(), StatusCode::CREATED);

        let login = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/doctor/login",
                None,
                json!({"email": "hale@clinic.org", "password": "pw-456"}),
            ))
            .await
            .unwrap();
        assert_eq!(login.status(), StatusCode::OK);
        cookie_of(&login)
    }

    #[tokio::test]
    async fn health_is_public_and_not_cached() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);

        let response = app.oneshot(get_request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["fallback_mode"], true);
    }

    #[tokio::test]
    async fn patient_page_without_session_redirects_to_login() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);

        let response = app
            .oneshot(get_request("/patient/dashboard", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/patient/login");
    }

    #[tokio::test]
    async fn doctor_page_without_session_redirects_to_doctor_login() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);

        let response = app
            .oneshot(get_request("/doctor/dashboard", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/doctor/login");
    }

    #[tokio::test]
    async fn json_routes_without_session_are_unauthorized() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);

        let response = app
            .oneshot(get_request("/doctor/patients/1/latest-assessment", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn patient_session_cannot_open_doctor_pages() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let cookie = patient_cookie(&app).await;

        let response = app
            .oneshot(get_request("/doctor/dashboard", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        patient_cookie(&app).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/patient/login",
                None,
                json!({"email": "ada@example.org", "password": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        patient_cookie(&app).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/patient/signup",
                None,
                json!({"name": "Ada", "email": "ada@example.org", "password": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn questionnaire_completes_after_four_steps() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let cookie = patient_cookie(&app).await;

        let steps = [
            json!({"age": "75", "gender": "Female"}),
            json!({"weight": "62", "height": "165"}),
            json!({"memoryComplaints": "severe", "familyHistory": ["Dementia"]}),
            json!({"neurologicalSymptoms": ["tremor", "confusion"]}),
        ];
        let mut last = Value::Null;
        for (i, answers) in steps.into_iter().enumerate() {
            let uri = format!("/patient/assessment?step={}", i + 1);
            let response = app
                .clone()
                .oneshot(json_request("POST", &uri, Some(&cookie), answers))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            last = body_json(response).await;
            if i < 3 {
                assert_eq!(last["status"], "continue");
                assert_eq!(last["next_step"], i + 2);
            }
        }

        assert_eq!(last["status"], "complete");
        assert!(last["assessment_id"].as_i64().unwrap() > 0);
        let scores = last["risk_scores"].as_array().unwrap();
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0]["disease"], "Alzheimer's");
        assert_eq!(scores[0]["score"], 65.0);
        assert_eq!(scores[0]["risk_level"], "moderate");

        // Draft is cleared once the assessment is stored.
        let step = app
            .clone()
            .oneshot(get_request("/patient/assessment", Some(&cookie)))
            .await
            .unwrap();
        let json = body_json(step).await;
        assert_eq!(json["step"], 1);
        assert!(json["draft"].as_object().unwrap().is_empty());

        // The assessment shows up on the timeline.
        let timeline = app
            .oneshot(get_request("/patient/timeline?type=assessment", Some(&cookie)))
            .await
            .unwrap();
        let json = body_json(timeline).await;
        assert_eq!(json["events"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_step_is_bad_request() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let cookie = patient_cookie(&app).await;

        let response = app
            .oneshot(get_request("/patient/assessment?step=9", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_update_round_trip() {
        let (core, _tmp) = test_core();
        let app = portal_router(core.clone());
        let cookie = patient_cookie(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/patient/profile",
                Some(&cookie),
                json!({"phone": "555-0100", "age": "71", "full_name": ""}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["phone"], "555-0100");
        assert_eq!(json["age"], 71);
        assert_eq!(json["full_name"], "Ada Byron");

        let conn = core.open_db().unwrap();
        let trail = crate::db::audit_trail_for_record(&conn, "patients", "1").unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, crate::models::enums::AuditAction::Update);
        assert_eq!(trail[0].changes["fields"], json!(["phone", "age"]));
    }

    #[tokio::test]
    async fn timeline_pdf_is_an_attachment() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let cookie = patient_cookie(&app).await;

        let response = app
            .oneshot(get_request("/patient/timeline/export", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        let bytes = to_bytes(response.into_body(), 10 * 1024 * 1024).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn diagnostics_without_patient_is_rejected() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let cookie = doctor_cookie(&app).await;

        for uri in ["/doctor/diagnostics", "/doctor/notes"] {
            let response = app
                .clone()
                .oneshot(json_request("POST", uri, Some(&cookie), json!({"age": 70})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = body_json(response).await;
            assert_eq!(json["status"], "error");
            assert_eq!(json["message"], "Missing patient or doctor");
        }
    }

    #[tokio::test]
    async fn diagnostics_store_report_and_event() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let patient = patient_cookie(&app).await;
        let doctor = doctor_cookie(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/doctor/diagnostics",
                Some(&doctor),
                json!({"patient_id": "1", "age": 78, "memoryComplaints": "moderate", "mmse_score": "21"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["patient_id"], 1);
        assert!(json["report_id"].is_i64());
        let total: f64 = json["disease_probabilities"]
            .as_object()
            .unwrap()
            .values()
            .map(|v| v.as_f64().unwrap())
            .sum();
        assert!((total - 1.0).abs() < 0.02);

        let timeline = app
            .oneshot(get_request("/patient/timeline?type=diagnosis", Some(&patient)))
            .await
            .unwrap();
        let json = body_json(timeline).await;
        assert_eq!(json["events"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn strict_diagnostics_for_unknown_patient_returns_placeholder() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let cookie = doctor_cookie(&app).await;

        let strict = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/doctor/diagnostics",
                Some(&cookie),
                json!({"patient_id": 404, "age": 70}),
            ))
            .await
            .unwrap();
        assert_eq!(strict.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(strict).await;
        assert_eq!(json["primary_diagnosis"], "Pending Medical Evaluation");
        assert!(json["report_id"].is_null());

        let lenient = app
            .oneshot(json_request(
                "POST",
                "/doctor/notes",
                Some(&cookie),
                json!({"patient_id": 404, "age": 70}),
            ))
            .await
            .unwrap();
        assert_eq!(lenient.status(), StatusCode::OK);
        let json = body_json(lenient).await;
        assert!(json["report_id"].as_str().unwrap().starts_with("temp_"));
    }

    #[tokio::test]
    async fn lenient_notes_store_report_for_known_patient() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        patient_cookie(&app).await;
        let doctor = doctor_cookie(&app).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/doctor/notes",
                Some(&doctor),
                json!({"patient_id": 1, "age": 74, "memoryComplaints": "severe"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert!(json["report_id"].is_i64());
        assert_eq!(json["primary_diagnosis"], "Alzheimer's");
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found_for_every_caller() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let patient = patient_cookie(&app).await;
        let doctor = doctor_cookie(&app).await;

        for (uri, cookie) in [
            ("/nope", None),
            ("/patient/nope", Some(patient.as_str())),
            ("/doctor/nope", Some(doctor.as_str())),
            ("/models/nope", None),
        ] {
            let response = app.clone().oneshot(get_request(uri, cookie)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn ehr_lists_assessment_diagnoses() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let cookie = patient_cookie(&app).await;

        let empty = app
            .clone()
            .oneshot(get_request("/patient/ehr", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::OK);
        let json = body_json(empty).await;
        assert_eq!(json["patient"]["full_name"], "Ada Byron");
        assert!(json["diagnoses"].as_array().unwrap().is_empty());

        let step4 = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/patient/assessment?step=4",
                Some(&cookie),
                json!({"age": 72}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(step4).await["status"], "complete");

        let filled = app
            .oneshot(get_request("/patient/ehr", Some(&cookie)))
            .await
            .unwrap();
        let json = body_json(filled).await;
        let diagnoses = json["diagnoses"].as_array().unwrap();
        assert_eq!(diagnoses.len(), 1);
        assert_eq!(diagnoses[0]["diag"]["primary_diagnosis"], "Alzheimer's");
    }

    #[tokio::test]
    async fn ehr_download_is_a_pdf_attachment() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let cookie = patient_cookie(&app).await;

        let response = app
            .oneshot(get_request("/patient/ehr/download", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"ehr_record.pdf\""
        );
        let bytes = to_bytes(response.into_body(), 10 * 1024 * 1024).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn latest_assessment_is_empty_then_summarized() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let doctor = doctor_cookie(&app).await;
        let patient = patient_cookie(&app).await;

        let empty = app
            .clone()
            .oneshot(get_request("/doctor/patients/1/latest-assessment", Some(&doctor)))
            .await
            .unwrap();
        assert_eq!(body_json(empty).await["status"], "empty");

        let step4 = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/patient/assessment?step=4",
                Some(&patient),
                json!({"age": 72}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(step4).await["status"], "complete");

        let latest = app
            .oneshot(get_request("/doctor/patients/1/latest-assessment", Some(&doctor)))
            .await
            .unwrap();
        let json = body_json(latest).await;
        assert_eq!(json["status"], "success");
        assert!(json["secondary_diagnoses"].as_str().unwrap().contains(", "));
    }

    #[tokio::test]
    async fn interventions_are_logged_and_listed() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        patient_cookie(&app).await;
        let doctor = doctor_cookie(&app).await;

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/doctor/interventions",
                Some(&doctor),
                json!({"patient_id": "1", "diagnosis": "Dementia",
                       "intervention_type": "Cognitive", "details": "Weekly therapy"}),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let listed = app
            .oneshot(get_request("/doctor/interventions", Some(&doctor)))
            .await
            .unwrap();
        let json = body_json(listed).await;
        let entries = json["interventions"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["title"], "Cognitive Intervention");
        assert_eq!(entries[0]["patient_name"], "Ada Byron");
    }

    #[tokio::test]
    async fn doctor_adds_and_searches_patients() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let doctor = doctor_cookie(&app).await;

        let added = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/doctor/patients",
                Some(&doctor),
                json!({"full_name": "Grace Hopper", "email": "grace@navy.mil",
                       "password": "cobol", "age": "85", "gender": "Female"}),
            ))
            .await
            .unwrap();
        assert_eq!(added.status(), StatusCode::CREATED);

        let found = app
            .oneshot(get_request("/doctor/patients?search=Hopper", Some(&doctor)))
            .await
            .unwrap();
        let json = body_json(found).await;
        assert_eq!(json["patients"].as_array().unwrap().len(), 1);
        assert_eq!(json["search"], "Hopper");
    }

    #[tokio::test]
    async fn mri_upload_is_stored_under_uploads() {
        let (core, _tmp) = test_core();
        let mri_dir = core.mri_dir();
        let app = portal_router(core);
        let doctor = doctor_cookie(&app).await;

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"mri_file\"; filename=\"../scan.nii\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             brain-bytes\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/doctor/mri")
            .header(header::COOKIE, &doctor)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        let file = std::path::PathBuf::from(json["file"].as_str().unwrap());
        assert_eq!(file.parent().unwrap(), mri_dir);
        assert!(file.file_name().unwrap().to_string_lossy().ends_with("_scan.nii"));
        assert_eq!(std::fs::read(&file).unwrap(), b"brain-bytes");
    }

    #[tokio::test]
    async fn mri_upload_without_file_reports_error() {
        let (core, _tmp) = test_core();
        let app = portal_router(core);
        let doctor = doctor_cookie(&app).await;

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             hello\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/doctor/mri")
            .header(header::COOKIE, &doctor)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "No file provided");
    }

    #[tokio::test]
    async fn logout_drops_session() {
        let (core, _tmp) = test_core();
        let ctx = ApiContext::new(core);
        let app = portal_router_with_ctx(ctx.clone());
        let cookie = patient_cookie(&app).await;
        assert_eq!(ctx.sessions.lock().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/logout", Some(&cookie), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(ctx.sessions.lock().unwrap().is_empty());

        let after = app
            .oneshot(get_request("/patient/dashboard", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::SEE_OTHER);
    }
}
