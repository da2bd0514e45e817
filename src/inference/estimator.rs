use super::features::FeatureVector;
use super::InferenceError;

/// A single trained model producing a risk probability in `[0, 1]`.
///
/// Implementations must be thread-safe: the manager is shared read-only
/// across request handlers.
pub trait RiskEstimator: Send + Sync {
    /// Artifact name from the model roster.
    fn name(&self) -> &str;

    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError>;
}

/// Estimator with a canned outcome, for composing managers without
/// artifacts on disk.
pub struct MockEstimator {
    name: String,
    outcome: Result<f64, String>,
}

impl MockEstimator {
    pub fn fixed(name: &str, probability: f64) -> Self {
        Self {
            name: name.to_string(),
            outcome: Ok(probability),
        }
    }

    pub fn failing(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: Err(reason.to_string()),
        }
    }
}

impl RiskEstimator for MockEstimator {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
        self.outcome.clone().map_err(InferenceError::Runtime)
    }
}
