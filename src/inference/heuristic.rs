//! Deterministic additive risk heuristic used whenever trained models are
//! unavailable.

use super::types::{RiskLevel, RiskPrediction, TopFactor};
use crate::models::QuestionnaireForm;

/// Confidence reported for heuristic scores.
pub const HEURISTIC_CONFIDENCE: f64 = 75.0;

const MAX_TOP_FACTORS: usize = 5;

/// +30 for age >= 70, +25 for moderate/severe memory complaints,
/// +5 per neurological symptom.
pub fn heuristic_score(form: &QuestionnaireForm) -> f64 {
    let mut score = 0.0;
    if form.age.unwrap_or(0.0) >= 70.0 {
        score += 30.0;
    }
    if form.has_memory_complaints() {
        score += 25.0;
    }
    score += 5.0 * form.symptom_count() as f64;
    score
}

/// Factors that pushed the score up, strongest signals first.
pub fn top_factors(form: &QuestionnaireForm) -> Vec<TopFactor> {
    let mut factors = Vec::new();
    if form.age.unwrap_or(0.0) >= 70.0 {
        factors.push(TopFactor("Age".into(), 90));
    }
    if form.has_memory_complaints() {
        factors.push(TopFactor("Memory".into(), 80));
    }
    if form.symptom_count() > 1 {
        factors.push(TopFactor("Neuro Symptoms".into(), 85));
    }
    factors.truncate(MAX_TOP_FACTORS);
    factors
}

pub fn heuristic_prediction(disease: &str, form: &QuestionnaireForm) -> RiskPrediction {
    let score = heuristic_score(form);
    RiskPrediction {
        disease: disease.to_string(),
        score,
        confidence: HEURISTIC_CONFIDENCE,
        risk_level: RiskLevel::from_score(score),
        top_factors: top_factors(form),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(age: f64, memory: &str, symptoms: &[&str]) -> QuestionnaireForm {
        QuestionnaireForm {
            age: Some(age),
            memory_complaints: Some(memory.into()),
            neurological_symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn elderly_severe_with_two_symptoms_is_moderate() {
        let f = form(75.0, "severe", &["tremor", "confusion"]);
        assert_eq!(heuristic_score(&f), 65.0);
        let prediction = heuristic_prediction("Dementia", &f);
        assert_eq!(prediction.risk_level, RiskLevel::Moderate);
        assert_eq!(prediction.confidence, 75.0);
        assert_eq!(
            prediction.top_factors,
            vec![
                TopFactor("Age".into(), 90),
                TopFactor("Memory".into(), 80),
                TopFactor("Neuro Symptoms".into(), 85),
            ]
        );
    }

    #[test]
    fn empty_form_scores_zero() {
        let f = QuestionnaireForm::default();
        assert_eq!(heuristic_score(&f), 0.0);
        assert!(top_factors(&f).is_empty());
    }

    #[test]
    fn age_boundary_is_inclusive() {
        assert_eq!(heuristic_score(&form(70.0, "none", &[])), 30.0);
        assert_eq!(heuristic_score(&form(69.0, "none", &[])), 0.0);
    }

    #[test]
    fn single_symptom_is_not_a_top_factor() {
        let f = form(50.0, "mild", &["tremor"]);
        assert_eq!(heuristic_score(&f), 5.0);
        assert!(top_factors(&f).is_empty());
    }

    #[test]
    fn many_symptoms_reach_high_risk() {
        let f = form(72.0, "moderate", &["a", "b", "c"]);
        assert_eq!(heuristic_score(&f), 70.0);
        assert_eq!(heuristic_prediction("Alzheimer's", &f).risk_level, RiskLevel::High);
    }

    #[test]
    fn uppercase_memory_grade_adds_nothing() {
        let f = form(50.0, "SEVERE", &[]);
        assert_eq!(heuristic_score(&f), 0.0);
        assert!(top_factors(&f).is_empty());
    }
}
