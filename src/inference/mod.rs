//! Risk model inference.
//!
//! `ModelManager` loads a fixed roster of pre-trained artifacts once at
//! startup and serves three per-disease risk predictors plus a diagnostic
//! aggregate over them. Every prediction path degrades to a deterministic
//! heuristic instead of failing: missing artifacts are skipped at load, and
//! estimator errors are absorbed per disease call.

pub mod boosted;
pub mod estimator;
pub mod features;
pub mod heuristic;
pub mod manager;
pub mod neural;
pub mod types;

pub use estimator::{MockEstimator, RiskEstimator};
pub use features::{extract_features, FeatureVector, StandardScaler, FEATURE_COUNT};
pub use manager::{AssessmentOutcome, ModelManager, ModelStatus, SkippedArtifact};
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed model artifact: {0}")]
    Malformed(String),

    #[error("Unsupported model: {0}")]
    Unsupported(String),

    #[error("Feature mismatch: expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("Inference runtime error: {0}")]
    Runtime(String),

    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Degenerate risk scores: totals to zero")]
    DegenerateScores,
}
