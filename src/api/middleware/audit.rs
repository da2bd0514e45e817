//! Access logging middleware.
//!
//! Logs every request with method, path, status, actor and latency.
//! Runs outermost; the actor is read from the response extensions where
//! the session guard leaves it.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use super::session::Actor;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let actor = response
        .extensions()
        .get::<Actor>()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    tracing::info!(
        %method,
        path,
        status = response.status().as_u16(),
        actor,
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    response
}
