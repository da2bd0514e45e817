//! MRI upload.

use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DoctorSession};

const FILE_FIELD: &str = "mri_file";
const MAX_FILENAME_LEN: usize = 100;

/// Final path component of a client filename, restricted to a safe
/// character set. `None` when nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .filter(|&c| c != '\0')
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_LEN)
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => None,
        _ => Some(cleaned),
    }
}

fn upload_error(message: &str) -> Json<Value> {
    Json(json!({ "status": "error", "message": message }))
}

/// `POST /doctor/mri`, multipart field `mri_file`.
pub async fn upload_mri(
    State(ctx): State<ApiContext>,
    Extension(doctor): Extension<DoctorSession>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
        file = Some((filename, bytes.to_vec()));
    }

    let Some((filename, bytes)) = file else {
        return Ok(upload_error("No file provided"));
    };
    let Some(safe_name) = sanitize_filename(&filename) else {
        return Ok(upload_error("Empty filename"));
    };

    let ts = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
    let dir = ctx.core.mri_dir();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ApiError::Internal(format!("create {}: {e}", dir.display())))?;
    let path = dir.join(format!("{ts}_{safe_name}"));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("write {}: {e}", path.display())))?;

    tracing::info!(
        doctor_id = doctor.doctor_id,
        bytes = bytes.len(),
        path = %path.display(),
        "MRI uploaded"
    );
    Ok(Json(json!({
        "status": "success",
        "message": "MRI uploaded successfully",
        "file": path.to_string_lossy(),
    })))
}
