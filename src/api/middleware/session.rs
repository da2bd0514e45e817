//! Cookie session guards.
//!
//! Resolves the `neurosense_session` cookie against the session store and
//! injects `PatientSession` or `DoctorSession` into request extensions.
//! Page routes answer a missing session with a redirect to the role's
//! login page; JSON routes answer 401.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{hash_token, session_token, ApiContext, DoctorSession, PatientSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Patient,
    Doctor,
}

impl Role {
    fn login_path(&self) -> &'static str {
        match self {
            Role::Patient => "/patient/login",
            Role::Doctor => "/doctor/login",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Denial {
    Redirect,
    Unauthorized,
}

/// Authenticated actor, attached to the response for the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Patient(i64),
    Doctor(i64),
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Patient(id) => write!(f, "patient:{id}"),
            Actor::Doctor(id) => write!(f, "doctor:{id}"),
        }
    }
}

pub async fn require_patient(req: Request<axum::body::Body>, next: Next) -> Response {
    guard(req, next, Role::Patient, Denial::Redirect).await
}

pub async fn require_doctor(req: Request<axum::body::Body>, next: Next) -> Response {
    guard(req, next, Role::Doctor, Denial::Redirect).await
}

/// Doctor guard for JSON-only routes.
pub async fn require_doctor_json(req: Request<axum::body::Body>, next: Next) -> Response {
    guard(req, next, Role::Doctor, Denial::Unauthorized).await
}

async fn guard(
    mut req: Request<axum::body::Body>,
    next: Next,
    role: Role,
    denial: Denial,
) -> Response {
    match authorize(&mut req, role, denial) {
        Ok(actor) => {
            let mut response = next.run(req).await;
            response.extensions_mut().insert(actor);
            response
        }
        Err(err) => err.into_response(),
    }
}

fn authorize(
    req: &mut Request<axum::body::Body>,
    role: Role,
    denial: Denial,
) -> Result<Actor, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let denied = || match denial {
        Denial::Redirect => ApiError::LoginRequired {
            login_path: role.login_path(),
        },
        Denial::Unauthorized => ApiError::Unauthorized,
    };

    let token = session_token(req.headers()).ok_or_else(denied)?;
    let token_hash = hash_token(&token);

    let (patient_id, doctor_id) = {
        let mut store = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        let entry = store.touch(&token_hash).ok_or_else(denied)?;
        (entry.patient_id, entry.doctor_id)
    };

    match role {
        Role::Patient => {
            let patient_id = patient_id.ok_or_else(denied)?;
            req.extensions_mut().insert(PatientSession {
                patient_id,
                token_hash,
            });
            Ok(Actor::Patient(patient_id))
        }
        Role::Doctor => {
            let doctor_id = doctor_id.ok_or_else(denied)?;
            req.extensions_mut().insert(DoctorSession {
                doctor_id,
                token_hash,
            });
            Ok(Actor::Doctor(doctor_id))
        }
    }
}
