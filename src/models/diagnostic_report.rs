use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Optional clinical measurements a doctor may attach to a diagnostic run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalMeasurements {
    pub mmse_score: Option<f64>,
    pub cdr_score: Option<f64>,
    pub csf_tau_level: Option<f64>,
    pub csf_abeta42_level: Option<f64>,
    pub apoe_status: Option<String>,
    pub mri_file_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDiagnosticReport {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub primary_diagnosis: String,
    pub diagnosis_confidence: f64,
    pub secondary_diagnoses: Vec<String>,
    pub disease_probabilities: BTreeMap<String, f64>,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub measurements: ClinicalMeasurements,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub primary_diagnosis: String,
    pub diagnosis_confidence: f64,
    pub secondary_diagnoses: Vec<String>,
    pub disease_probabilities: BTreeMap<String, f64>,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(flatten)]
    pub measurements: ClinicalMeasurements,
    pub created_at: NaiveDateTime,
}
