use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPatient {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
}

/// Profile fields a patient may change. `password_hash` is `None` when
/// the credential is left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PatientProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub password_hash: Option<String>,
}

/// Row used by pickers and the dashboard roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientName {
    pub id: i64,
    pub full_name: String,
}
