//! API endpoint handlers.
//!
//! One module per portal screen. Handlers open a connection per request
//! and delegate to the repository, inference and export modules.

pub mod assessment;
pub mod auth;
pub mod dashboard;
pub mod diagnostics;
pub mod ehr;
pub mod health;
pub mod interventions;
pub mod patients;
pub mod profile;
pub mod timeline;
pub mod uploads;

use axum::http::header;
use axum::response::{IntoResponse, Response};

/// PDF download response.
pub(crate) fn pdf_attachment(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
