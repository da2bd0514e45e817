use rusqlite::Connection;
use serde::Serialize;

use super::{count_events_by_severity, count_patients, count_reports_by_confidence};
use crate::db::DatabaseError;
use crate::models::enums::Severity;

/// Confidence at or above which a diagnostic report counts as high risk.
pub const HIGH_RISK_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub total_patients: i64,
    pub high_risk: i64,
    pub pending: i64,
    pub alerts: i64,
}

pub fn dashboard_counts(conn: &Connection) -> Result<DashboardCounts, DatabaseError> {
    let total_patients = count_patients(conn)?;
    let (high_risk, pending) = count_reports_by_confidence(conn, HIGH_RISK_CONFIDENCE)?;
    let alerts = count_events_by_severity(conn, Severity::High)?;
    Ok(DashboardCounts {
        total_patients,
        high_risk,
        pending,
        alerts,
    })
}
