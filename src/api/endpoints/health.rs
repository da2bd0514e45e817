//! Liveness and model roster status.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::inference::ModelStatus;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub fallback_mode: bool,
    pub models_loaded: usize,
}

/// `GET /health`
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let status = ctx.core.models.status();
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        fallback_mode: status.fallback_mode,
        models_loaded: status.loaded.len(),
    })
}

/// `GET /models/status`
pub async fn model_status(State(ctx): State<ApiContext>) -> Json<ModelStatus> {
    Json(ctx.core.models.status())
}
