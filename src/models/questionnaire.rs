//! Questionnaire schema.
//!
//! Answers arrive step by step as loosely typed JSON (HTML forms submit
//! numbers as strings, multi-selects as arrays or comma lists). The schema
//! parses them leniently, then `validate()` enforces ranges at the boundary.
//! Fields the risk models do not read are kept in `extra` and stored with
//! the assessment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Number of steps in the patient questionnaire.
pub const QUESTIONNAIRE_STEPS: u8 = 4;

#[derive(Error, Debug, PartialEq)]
pub enum FormError {
    #[error("Invalid questionnaire field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Malformed questionnaire: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireForm {
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub alcohol_consumption: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string_list", skip_serializing_if = "Vec::is_empty")]
    pub family_history: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub memory_complaints: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list", skip_serializing_if = "Vec::is_empty")]
    pub neurological_symptoms: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuestionnaireForm {
    /// Parse a merged questionnaire draft.
    pub fn from_draft(draft: &Map<String, Value>) -> Result<Self, FormError> {
        serde_json::from_value(Value::Object(draft.clone()))
            .map_err(|e| FormError::Malformed(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), FormError> {
        check_range("age", self.age, 0.0, 130.0)?;
        check_range("weight", self.weight, 0.0, 500.0)?;
        check_range("height", self.height, 0.0, 300.0)?;
        check_range("alcoholConsumption", self.alcohol_consumption, 0.0, f64::MAX)?;
        Ok(())
    }

    pub fn is_male(&self) -> bool {
        self.gender.as_deref() == Some("Male")
    }

    /// Memory complaints graded moderate or severe. Grades are matched exactly.
    pub fn has_memory_complaints(&self) -> bool {
        matches!(self.memory_complaints.as_deref(), Some("moderate" | "severe"))
    }

    pub fn symptom_count(&self) -> usize {
        self.neurological_symptoms.len()
    }

    pub fn family_history_includes(&self, condition: &str) -> bool {
        self.family_history.iter().any(|c| c == condition)
    }
}

fn check_range(
    field: &'static str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<(), FormError> {
    match value {
        Some(v) if !v.is_finite() || v < min || v > max => Err(FormError::Invalid {
            field,
            reason: format!("{v} outside {min}..={max}"),
        }),
        _ => Ok(()),
    }
}

/// Deserializers tolerant of HTML-form encodings.
pub(crate) mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<f64>()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("not a number: {s}")))
            }
            Some(other) => Err(D::Error::custom(format!("not a number: {other}"))),
        }
    }

    pub fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("not an integer: {n}"))),
            Some(Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<i64>()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("not an integer: {s}")))
            }
            Some(other) => Err(D::Error::custom(format!("not an integer: {other}"))),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => {
                let s = s.trim();
                Ok((!s.is_empty()).then(|| s.to_string()))
            }
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(D::Error::custom(format!("not text: {other}"))),
        }
    }

    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.is_empty())
                .collect()),
            Some(Value::String(s)) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()),
            Some(other) => Err(D::Error::custom(format!("not a list: {other}"))),
        }
    }
}
