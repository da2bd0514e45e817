use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{EventType, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEvent {
    pub id: i64,
    pub patient_id: i64,
    pub event_type: EventType,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub disease: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewHealthEvent {
    pub patient_id: i64,
    pub event_type: EventType,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub disease: Option<String>,
}

/// Intervention row joined with the patient's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionEntry {
    pub id: i64,
    pub patient_name: String,
    pub title: String,
    pub description: String,
    pub disease: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct HealthEventFilter {
    pub event_type: Option<EventType>,
    pub disease: Option<String>,
}
