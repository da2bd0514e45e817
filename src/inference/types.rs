use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scores at or above this are high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 70.0;
/// Scores at or above this (and below high) are moderate risk.
pub const MODERATE_RISK_THRESHOLD: f64 = 40.0;

/// Diseases scored by the model manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disease {
    Alzheimers,
    Parkinsons,
    Dementia,
}

impl Disease {
    pub const ALL: [Disease; 3] = [Disease::Alzheimers, Disease::Parkinsons, Disease::Dementia];

    pub fn label(&self) -> &'static str {
        match self {
            Disease::Alzheimers => "Alzheimer's",
            Disease::Parkinsons => "Parkinson's",
            Disease::Dementia => "Dementia",
        }
    }

    /// Confidence reported when the trained models produced the score.
    pub fn model_confidence(&self) -> f64 {
        match self {
            Disease::Alzheimers => 90.0,
            Disease::Parkinsons => 88.0,
            Disease::Dementia => 87.0,
        }
    }
}

impl std::fmt::Display for Disease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Band a 0-100 score: low < 40 <= moderate < 70 <= high.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if score >= MODERATE_RISK_THRESHOLD {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

/// A contributing factor and its weight, serialized as `["Age", 90]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopFactor(pub String, pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub disease: String,
    /// 0-100.
    pub score: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub top_factors: Vec<TopFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub primary_diagnosis: String,
    /// Top score / 100, rounded to two decimals. Not clamped.
    pub diagnosis_confidence: f64,
    pub secondary_diagnoses: Vec<String>,
    pub disease_probabilities: BTreeMap<String, f64>,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_closed_below() {
        assert_eq!(RiskLevel::from_score(39.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(69.9), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(70.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::High);
    }

    #[test]
    fn top_factor_serializes_as_pair() {
        let json = serde_json::to_string(&TopFactor("Age".into(), 90)).unwrap();
        assert_eq!(json, r#"["Age",90]"#);
    }

    #[test]
    fn risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Moderate).unwrap(), "\"moderate\"");
    }

    #[test]
    fn disease_labels() {
        assert_eq!(Disease::Alzheimers.to_string(), "Alzheimer's");
        assert_eq!(Disease::Parkinsons.label(), "Parkinson's");
        assert_eq!(Disease::Dementia.model_confidence(), 87.0);
    }
}
