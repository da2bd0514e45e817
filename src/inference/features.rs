//! Feature extraction shared by every estimator.

use std::path::Path;

use serde::Deserialize;

use super::InferenceError;
use crate::models::QuestionnaireForm;

pub const FEATURE_COUNT: usize = 8;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "weight",
    "height",
    "gender_male",
    "alcohol_consumption",
    "family_alzheimers",
    "family_parkinsons",
    "family_dementia",
];

const DEFAULT_AGE: f64 = 65.0;
const DEFAULT_WEIGHT: f64 = 70.0;
const DEFAULT_HEIGHT: f64 = 170.0;

pub type FeatureVector = [f32; FEATURE_COUNT];

/// Build the fixed feature vector. Questionnaire content outside these
/// eight fields does not reach the models.
pub fn extract_features(form: &QuestionnaireForm) -> FeatureVector {
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    [
        form.age.unwrap_or(DEFAULT_AGE) as f32,
        form.weight.unwrap_or(DEFAULT_WEIGHT) as f32,
        form.height.unwrap_or(DEFAULT_HEIGHT) as f32,
        flag(form.is_male()),
        form.alcohol_consumption.unwrap_or(0.0) as f32,
        flag(form.family_history_includes("Alzheimer's Disease")),
        flag(form.family_history_includes("Parkinson's Disease")),
        flag(form.family_history_includes("Dementia")),
    ]
}

/// Standardization parameters exported from a fitted sklearn `StandardScaler`.
/// Loaded and reported for inventory; estimators consume the raw vector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let raw = std::fs::read_to_string(path)?;
        let scaler: StandardScaler =
            serde_json::from_str(&raw).map_err(|e| InferenceError::Malformed(e.to_string()))?;
        scaler.check()?;
        Ok(scaler)
    }

    fn check(&self) -> Result<(), InferenceError> {
        for len in [self.mean.len(), self.scale.len()] {
            if len != FEATURE_COUNT {
                return Err(InferenceError::FeatureMismatch {
                    expected: FEATURE_COUNT,
                    actual: len,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let fv = extract_features(&QuestionnaireForm::default());
        assert_eq!(fv, [65.0, 70.0, 170.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn flags_follow_gender_and_family_history() {
        let form = QuestionnaireForm {
            age: Some(80.0),
            gender: Some("Male".into()),
            alcohol_consumption: Some(3.0),
            family_history: vec!["Parkinson's Disease".into(), "Dementia".into()],
            neurological_symptoms: vec!["tremor".into()],
            ..Default::default()
        };
        let fv = extract_features(&form);
        assert_eq!(fv, [80.0, 70.0, 170.0, 1.0, 3.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn scaler_with_wrong_width_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scaler.json");
        std::fs::write(&path, r#"{"mean":[1.0],"scale":[1.0]}"#).unwrap();
        let err = StandardScaler::load(&path).unwrap_err();
        assert!(matches!(err, InferenceError::FeatureMismatch { expected: 8, actual: 1 }));
    }

    #[test]
    fn lowercase_gender_is_not_flagged() {
        let form = QuestionnaireForm {
            gender: Some("male".into()),
            ..Default::default()
        };
        assert_eq!(extract_features(&form)[3], 0.0);
    }
}
