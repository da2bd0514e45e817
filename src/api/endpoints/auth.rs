//! Account creation, login and logout.
//!
//! Passwords are hashed off the async runtime; PBKDF2 is deliberately slow.

use std::sync::LazyLock;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::types::{
    expired_session_cookie, hash_token, session_cookie, session_token, ApiContext, SessionEntry,
};
use crate::auth;
use crate::db;
use crate::models::{NewDoctor, NewPatient};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub(crate) async fn hash_blocking(password: String) -> Result<String, ApiError> {
    Ok(tokio::task::spawn_blocking(move || auth::hash_password(&password)).await??)
}

/// `Ok(Some(id))` when the password matches the stored hash.
async fn verify_blocking(
    creds: Option<(i64, String)>,
    password: String,
) -> Result<Option<i64>, ApiError> {
    let Some((id, stored)) = creds else {
        return Ok(None);
    };
    let verified =
        tokio::task::spawn_blocking(move || auth::verify_password(&password, &stored)).await?;
    match verified {
        Ok(true) => Ok(Some(id)),
        Ok(false) => Ok(None),
        Err(e) => {
            tracing::warn!(account = id, error = %e, "Stored password hash unusable");
            Ok(None)
        }
    }
}

pub(crate) fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

pub(crate) fn email(value: &str) -> Result<String, ApiError> {
    let value = required("email", value)?.to_lowercase();
    if !EMAIL_PATTERN.is_match(&value) {
        return Err(ApiError::BadRequest("email is invalid".into()));
    }
    Ok(value)
}

fn conflict_or(err: db::DatabaseError) -> ApiError {
    if err.is_unique_violation() {
        ApiError::Conflict("Email already registered".into())
    } else {
        err.into()
    }
}

/// `POST /patient/signup`
pub async fn patient_signup(
    State(ctx): State<ApiContext>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let full_name = required("name", &req.name)?;
    let email = email(&req.email)?;
    let password_hash = hash_blocking(req.password).await?;

    let conn = ctx.core.open_db()?;
    let patient_id = db::insert_patient(
        &conn,
        &NewPatient {
            full_name,
            email,
            password_hash,
            phone: None,
            age: None,
            gender: None,
            blood_type: None,
        },
    )
    .map_err(conflict_or)?;

    tracing::info!(patient_id, "Patient signed up");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "created", "patient_id": patient_id })),
    ))
}

/// `POST /doctor/register`
pub async fn doctor_register(
    State(ctx): State<ApiContext>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let name = required("name", &req.name)?;
    let email = email(&req.email)?;
    let password_hash = hash_blocking(req.password).await?;

    let conn = ctx.core.open_db()?;
    let doctor_id = db::insert_doctor(
        &conn,
        &NewDoctor {
            name,
            email,
            password_hash,
        },
    )
    .map_err(conflict_or)?;

    tracing::info!(doctor_id, "Doctor registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "created", "doctor_id": doctor_id })),
    ))
}

/// `POST /patient/login`
pub async fn patient_login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let creds = {
        let conn = ctx.core.open_db()?;
        db::find_patient_credentials(&conn, &req.email.trim().to_lowercase())?
    };
    let patient_id = verify_blocking(creds, req.password)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let token = start_session(&ctx, SessionEntry::patient(patient_id))?;
    tracing::info!(patient_id, "Patient logged in");
    Ok(with_cookie(
        &ctx,
        &token,
        json!({ "status": "success", "patient_id": patient_id, "redirect": "/patient/dashboard" }),
    ))
}

/// `POST /doctor/login`
pub async fn doctor_login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let creds = {
        let conn = ctx.core.open_db()?;
        db::find_doctor_credentials(&conn, &req.email.trim().to_lowercase())?
    };
    let doctor_id = verify_blocking(creds, req.password)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let token = start_session(&ctx, SessionEntry::doctor(doctor_id))?;
    tracing::info!(doctor_id, "Doctor logged in");
    Ok(with_cookie(
        &ctx,
        &token,
        json!({ "status": "success", "doctor_id": doctor_id, "redirect": "/doctor/dashboard" }),
    ))
}

/// `POST /logout`: drop the session, if any, and expire the cookie.
pub async fn logout(State(ctx): State<ApiContext>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        let mut store = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        store.remove(&hash_token(&token));
    }
    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::SET_COOKIE, expired_session_cookie()),
            (header::LOCATION, "/patient/login".to_string()),
        ],
    )
        .into_response())
}

fn start_session(ctx: &ApiContext, entry: SessionEntry) -> Result<String, ApiError> {
    let mut store = ctx
        .sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock".into()))?;
    Ok(store.create(entry))
}

fn with_cookie(ctx: &ApiContext, token: &str, body: serde_json::Value) -> Response {
    (
        [(
            header::SET_COOKIE,
            session_cookie(token, ctx.core.config.session_ttl_secs),
        )],
        Json(body),
    )
        .into_response()
}
