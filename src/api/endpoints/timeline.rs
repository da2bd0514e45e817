//! Patient health timeline and its PDF export.

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::pdf_attachment;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PatientSession};
use crate::db;
use crate::export;
use crate::models::enums::EventType;
use crate::models::HealthEventFilter;

#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub disease: Option<String>,
}

impl TimelineQuery {
    fn filter(&self) -> Result<HealthEventFilter, ApiError> {
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let event_type = non_blank(&self.event_type)
            .map(|t| EventType::from_str(&t))
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(HealthEventFilter {
            event_type,
            disease: non_blank(&self.disease),
        })
    }
}

/// `GET /patient/timeline?type=&disease=`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<PatientSession>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = query.filter()?;
    let conn = ctx.core.open_db()?;
    let events = db::list_patient_events(&conn, session.patient_id, &filter)?;
    Ok(Json(json!({ "events": events })))
}

/// `GET /patient/timeline/export`
pub async fn export_pdf(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<PatientSession>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let events = db::list_patient_events(&conn, session.patient_id, &HealthEventFilter::default())?;
    let bytes = export::timeline_pdf(&events)?;
    tracing::info!(patient_id = session.patient_id, events = events.len(), "Timeline exported");
    Ok(pdf_attachment(bytes, "health_timeline.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_values_are_ignored() {
        let query = TimelineQuery {
            event_type: Some("  ".into()),
            disease: Some("".into()),
        };
        let filter = query.filter().unwrap();
        assert!(filter.event_type.is_none());
        assert!(filter.disease.is_none());
    }

    #[test]
    fn unknown_event_type_is_bad_request() {
        let query = TimelineQuery {
            event_type: Some("surgery".into()),
            disease: None,
        };
        assert!(matches!(query.filter(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn known_event_type_is_parsed() {
        let query = TimelineQuery {
            event_type: Some("intervention".into()),
            disease: Some("Dementia".into()),
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.event_type, Some(EventType::Intervention));
        assert_eq!(filter.disease.as_deref(), Some("Dementia"));
    }
}
