//! Model roster loading and the public prediction surface.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::boosted::BoostedTreeModel;
use super::estimator::RiskEstimator;
use super::features::{extract_features, StandardScaler};
use super::heuristic::{heuristic_prediction, top_factors};
use super::neural::load_neural;
use super::types::{DiagnosticResult, Disease, RiskLevel, RiskPrediction};
use super::InferenceError;
use crate::models::QuestionnaireForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactKind {
    BoostedTrees,
    Neural,
    Scaler,
}

struct RosterEntry {
    name: &'static str,
    file: &'static str,
    kind: ArtifactKind,
}

const NEURAL_MODEL: &str = "tf_neuro_model";

const ROSTER: [RosterEntry; 6] = [
    RosterEntry { name: "alzheimer_model1_xgb", file: "alzheimer_model1_xgb.json", kind: ArtifactKind::BoostedTrees },
    RosterEntry { name: "parkinsons_model1_xgb", file: "parkinsons_model1_xgb.json", kind: ArtifactKind::BoostedTrees },
    RosterEntry { name: "dementia_oasis_model", file: "dementia_oasis_model.json", kind: ArtifactKind::BoostedTrees },
    RosterEntry { name: NEURAL_MODEL, file: "tf_multimodal_model.onnx", kind: ArtifactKind::Neural },
    RosterEntry { name: "dementia_scaler", file: "dementia_scaler.json", kind: ArtifactKind::Scaler },
    RosterEntry { name: "parkinsons_scaler1", file: "parkinsons_scaler1.json", kind: ArtifactKind::Scaler },
];

/// Which estimators serve a disease, in averaging order.
fn estimators_for(disease: Disease) -> [&'static str; 2] {
    match disease {
        Disease::Alzheimers => ["alzheimer_model1_xgb", NEURAL_MODEL],
        Disease::Parkinsons => ["parkinsons_model1_xgb", NEURAL_MODEL],
        Disease::Dementia => ["dementia_oasis_model", NEURAL_MODEL],
    }
}

const RECOMMENDATIONS: [&str; 3] = [
    "Consult neurologist",
    "Consider MRI/CT scan",
    "Maintain lifestyle modifications",
];

/// An artifact that did not load, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedArtifact {
    pub name: String,
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub fallback_mode: bool,
    pub loaded: Vec<String>,
    pub skipped: Vec<SkippedArtifact>,
}

/// Everything one questionnaire completion needs from the models.
#[derive(Debug, Clone)]
pub struct AssessmentOutcome {
    pub alzheimers: RiskPrediction,
    pub parkinsons: RiskPrediction,
    pub dementia: RiskPrediction,
    pub diagnostic: DiagnosticResult,
}

/// Read-only after construction; share it behind `Arc`.
pub struct ModelManager {
    estimators: HashMap<String, Arc<dyn RiskEstimator>>,
    scalers: HashMap<String, StandardScaler>,
    skipped: Vec<SkippedArtifact>,
    fallback_mode: bool,
}

impl ModelManager {
    /// Load every roster artifact found in `models_dir`. Never fails:
    /// unusable artifacts are logged and skipped, and with no estimator
    /// loaded the manager runs in fallback mode.
    pub fn load(models_dir: &Path) -> Self {
        let mut estimators: Vec<Arc<dyn RiskEstimator>> = Vec::new();
        let mut scalers = Vec::new();
        let mut skipped = Vec::new();

        for entry in &ROSTER {
            let path = models_dir.join(entry.file);
            if !path.exists() {
                tracing::warn!(artifact = entry.name, path = %path.display(), "Model artifact not found");
                skipped.push(SkippedArtifact {
                    name: entry.name.to_string(),
                    file: entry.file.to_string(),
                    reason: "not found".to_string(),
                });
                continue;
            }

            let loaded = match entry.kind {
                ArtifactKind::BoostedTrees => BoostedTreeModel::load(entry.name, &path)
                    .map(|m| estimators.push(Arc::new(m))),
                ArtifactKind::Neural => load_neural(entry.name, &path).map(|m| estimators.push(m)),
                ArtifactKind::Scaler => StandardScaler::load(&path)
                    .map(|s| scalers.push((entry.name.to_string(), s))),
            };

            match loaded {
                Ok(()) => tracing::info!(artifact = entry.name, "Model artifact loaded"),
                Err(e) => {
                    tracing::warn!(artifact = entry.name, error = %e, "Model artifact skipped");
                    skipped.push(SkippedArtifact {
                        name: entry.name.to_string(),
                        file: entry.file.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut manager = Self::from_parts(estimators, scalers);
        manager.skipped = skipped;
        if manager.fallback_mode {
            tracing::warn!(dir = %models_dir.display(), "No risk models loaded, using heuristic scoring");
        }
        manager
    }

    /// Assemble a manager from already-built estimators and scalers.
    pub fn from_parts(
        estimators: Vec<Arc<dyn RiskEstimator>>,
        scalers: Vec<(String, StandardScaler)>,
    ) -> Self {
        let estimators: HashMap<String, Arc<dyn RiskEstimator>> = estimators
            .into_iter()
            .map(|e| (e.name().to_string(), e))
            .collect();
        Self {
            fallback_mode: estimators.is_empty(),
            estimators,
            scalers: scalers.into_iter().collect(),
            skipped: Vec::new(),
        }
    }

    /// Manager with no artifacts; every prediction is heuristic.
    pub fn heuristic_only() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_mode
    }

    pub fn status(&self) -> ModelStatus {
        let mut loaded: Vec<String> = self
            .estimators
            .keys()
            .chain(self.scalers.keys())
            .cloned()
            .collect();
        loaded.sort();
        ModelStatus {
            fallback_mode: self.fallback_mode,
            loaded,
            skipped: self.skipped.clone(),
        }
    }

    pub fn predict_alzheimers_risk(&self, form: &QuestionnaireForm) -> RiskPrediction {
        self.predict_risk(Disease::Alzheimers, form)
    }

    pub fn predict_parkinsons_risk(&self, form: &QuestionnaireForm) -> RiskPrediction {
        self.predict_risk(Disease::Parkinsons, form)
    }

    pub fn predict_dementia_risk(&self, form: &QuestionnaireForm) -> RiskPrediction {
        self.predict_risk(Disease::Dementia, form)
    }

    pub fn predict_risk(&self, disease: Disease, form: &QuestionnaireForm) -> RiskPrediction {
        if self.fallback_mode {
            return heuristic_prediction(disease.label(), form);
        }

        let names = estimators_for(disease);
        let features = extract_features(form);

        let mut outputs = Vec::with_capacity(names.len());
        for name in names {
            let Some(estimator) = self.estimators.get(name) else {
                continue;
            };
            match estimator.predict(&features) {
                Ok(p) if p.is_finite() => outputs.push(p),
                Ok(p) => tracing::warn!(model = name, output = p, "Non-finite model output ignored"),
                Err(e) => tracing::warn!(model = name, error = %e, "Model prediction failed"),
            }
        }

        if outputs.is_empty() {
            tracing::debug!(disease = disease.label(), "No model output, using heuristic");
            return heuristic_prediction(disease.label(), form);
        }

        let mean = outputs.iter().sum::<f64>() / outputs.len() as f64;
        let score = (mean * 100.0).clamp(0.0, 100.0);
        RiskPrediction {
            disease: disease.label().to_string(),
            score,
            confidence: disease.model_confidence(),
            risk_level: RiskLevel::from_score(score),
            top_factors: top_factors(form),
        }
    }

    /// Rank the three predictions. Errors when all scores are zero.
    pub fn predict_diagnostic(
        &self,
        form: &QuestionnaireForm,
    ) -> Result<DiagnosticResult, InferenceError> {
        aggregate(vec![
            self.predict_alzheimers_risk(form),
            self.predict_dementia_risk(form),
            self.predict_parkinsons_risk(form),
        ])
    }

    /// Diagnostic over the heuristic predictions; never fails.
    pub fn fallback_diagnostic(&self, form: &QuestionnaireForm) -> DiagnosticResult {
        let triple: Vec<RiskPrediction> = [Disease::Alzheimers, Disease::Dementia, Disease::Parkinsons]
            .iter()
            .map(|d| heuristic_prediction(d.label(), form))
            .collect();
        aggregate(triple.clone()).unwrap_or_else(|_| uniform(triple))
    }

    /// Three predictions and their diagnostic from a single pass over the
    /// models.
    pub fn assess(&self, form: &QuestionnaireForm) -> AssessmentOutcome {
        let alzheimers = self.predict_alzheimers_risk(form);
        let parkinsons = self.predict_parkinsons_risk(form);
        let dementia = self.predict_dementia_risk(form);
        let diagnostic = aggregate(vec![alzheimers.clone(), dementia.clone(), parkinsons.clone()])
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "Diagnostic aggregation degenerate, using fallback");
                self.fallback_diagnostic(form)
            });
        AssessmentOutcome {
            alzheimers,
            parkinsons,
            dementia,
            diagnostic,
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn aggregate(mut ranked: Vec<RiskPrediction>) -> Result<DiagnosticResult, InferenceError> {
    // sort_by is stable: ties keep input order
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    let total: f64 = ranked.iter().map(|p| p.score).sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(InferenceError::DegenerateScores);
    }
    let probabilities = ranked
        .iter()
        .map(|p| (p.disease.clone(), p.score / total))
        .collect();
    Ok(build_result(ranked, probabilities))
}

fn uniform(ranked: Vec<RiskPrediction>) -> DiagnosticResult {
    let share = 1.0 / ranked.len().max(1) as f64;
    let probabilities = ranked.iter().map(|p| (p.disease.clone(), share)).collect();
    build_result(ranked, probabilities)
}

fn build_result(ranked: Vec<RiskPrediction>, probabilities: BTreeMap<String, f64>) -> DiagnosticResult {
    let (primary, top_score) = ranked
        .first()
        .map(|p| (p.disease.clone(), p.score))
        .unwrap_or_default();
    DiagnosticResult {
        key_findings: vec![format!("Primary risk detected: {primary}")],
        diagnosis_confidence: round2(top_score / 100.0),
        secondary_diagnoses: ranked.iter().skip(1).map(|p| p.disease.clone()).collect(),
        primary_diagnosis: primary,
        disease_probabilities: probabilities,
        recommendations: RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
    }
}
