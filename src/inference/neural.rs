use std::path::Path;
use std::sync::Arc;

use super::estimator::RiskEstimator;
use super::InferenceError;

// ═══════════════════════════════════════════════════════════
// ONNX neural risk model, behind the `onnx-models` feature
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx-models")]
mod onnx {
    use super::{InferenceError, RiskEstimator};
    use crate::inference::features::{FeatureVector, FEATURE_COUNT};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;

    /// Multimodal network exported to ONNX: `[1, 8]` f32 in, probability
    /// as the first output element.
    ///
    /// `Session::run` needs `&mut self`, hence the Mutex.
    pub struct OnnxRiskModel {
        name: String,
        session: Mutex<Session>,
    }

    impl OnnxRiskModel {
        pub fn load(name: &str, path: &Path) -> Result<Self, InferenceError> {
            let session = Session::builder()
                .map_err(|e: ort::Error| InferenceError::Runtime(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| InferenceError::Runtime(e.to_string()))?
                .commit_from_file(path)
                .map_err(|e: ort::Error| InferenceError::Runtime(format!("ONNX load failed: {e}")))?;

            tracing::info!(model = name, path = %path.display(), "ONNX risk model loaded");

            Ok(Self {
                name: name.to_string(),
                session: Mutex::new(session),
            })
        }
    }

    impl RiskEstimator for OnnxRiskModel {
        fn name(&self) -> &str {
            &self.name
        }

        fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
            use ort::value::TensorRef;

            let input = ndarray::Array2::from_shape_vec((1, FEATURE_COUNT), features.to_vec())
                .map_err(|e| InferenceError::Runtime(e.to_string()))?;
            let tensor = TensorRef::from_array_view(&input)
                .map_err(|e| InferenceError::Runtime(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| InferenceError::Runtime("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| InferenceError::Runtime(format!("ONNX inference failed: {e}")))?;

            let (_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| InferenceError::Runtime(format!("Output extraction: {e}")))?;

            data.first()
                .map(|&p| f64::from(p))
                .ok_or_else(|| InferenceError::Runtime("Empty model output".to_string()))
        }
    }
}

#[cfg(feature = "onnx-models")]
pub use onnx::OnnxRiskModel;

/// Load the neural artifact.
#[cfg(feature = "onnx-models")]
pub fn load_neural(name: &str, path: &Path) -> Result<Arc<dyn RiskEstimator>, InferenceError> {
    Ok(Arc::new(OnnxRiskModel::load(name, path)?))
}

/// Without ONNX Runtime compiled in the neural artifact cannot be used.
#[cfg(not(feature = "onnx-models"))]
pub fn load_neural(name: &str, path: &Path) -> Result<Arc<dyn RiskEstimator>, InferenceError> {
    tracing::debug!(model = name, path = %path.display(), "ONNX support not compiled in");
    Err(InferenceError::RuntimeUnavailable(
        "built without the onnx-models feature".to_string(),
    ))
}
