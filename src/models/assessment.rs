use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::questionnaire::QuestionnaireForm;
use crate::inference::{DiagnosticResult, RiskPrediction};

#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub patient_id: i64,
    pub form: QuestionnaireForm,
    pub alz: RiskPrediction,
    pub park: RiskPrediction,
    pub dem: RiskPrediction,
    pub diag: DiagnosticResult,
}

/// Assessment as read back from storage. Every blob is parsed leniently:
/// a malformed or missing column becomes an empty object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAssessment {
    pub id: i64,
    pub patient_id: i64,
    pub form_data: Map<String, Value>,
    pub alz: Map<String, Value>,
    pub park: Map<String, Value>,
    pub dem: Map<String, Value>,
    pub diag: Map<String, Value>,
    pub created_at: NaiveDateTime,
}

/// Diagnosis blob of one assessment, for the EHR view and export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDiagnosis {
    pub diag: Map<String, Value>,
    pub created_at: NaiveDateTime,
}

/// Parse a stored JSON text column into an object, falling back to an
/// empty object on anything unexpected.
pub fn parse_stored_object(raw: Option<&str>) -> Map<String, Value> {
    let Some(raw) = raw else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Malformed stored JSON replaced with empty object");
            Map::new()
        }
    }
}

/// Parse a stored JSON text column into a list of strings (empty on error).
pub fn parse_stored_strings(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|r| serde_json::from_str::<Vec<String>>(r).ok())
        .unwrap_or_default()
}
