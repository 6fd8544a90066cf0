//! Model artifact loader

use crate::error::{ChurnError, Result};
use crate::models::inference::ChurnModel;
use crate::models::linear::LinearModel;
use crate::models::onnx::OnnxModel;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Loader for the fitted churn model.
///
/// The artifact format follows the file extension: `.onnx` graphs run on
/// ONNX Runtime, `.json` files hold linear model coefficients.
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the model at `path`.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Arc<dyn ChurnModel>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ChurnError::ArtifactLoad(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let model: Arc<dyn ChurnModel> = match extension.as_deref() {
            Some("onnx") => {
                ort::init()
                    .commit()
                    .map_err(|e| ChurnError::ArtifactLoad(format!("onnx runtime init: {e}")))?;
                info!(onnx_threads = self.onnx_threads, "ONNX Runtime initialized");
                Arc::new(OnnxModel::load(path, self.onnx_threads)?)
            }
            Some("json") => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ChurnError::ArtifactLoad(format!("cannot read model {}: {e}", path.display()))
                })?;
                Arc::new(LinearModel::from_json_str(&text)?)
            }
            _ => {
                return Err(ChurnError::ArtifactLoad(format!(
                    "unsupported model format: {}",
                    path.display()
                )))
            }
        };

        info!(
            model = %model.name(),
            path = %path.display(),
            capability = ?model.capability(),
            "Model loaded successfully"
        );
        Ok(model)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::ModelCapability;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_missing_file_is_load_error() {
        let err = ModelLoader::new().load("does/not/exist.onnx").err().unwrap();
        assert!(matches!(err, ChurnError::ArtifactLoad(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = Builder::new().suffix(".pkl").tempfile().unwrap();
        let err = ModelLoader::new().load(file.path()).err().unwrap();
        assert!(err.to_string().contains("unsupported model format"));
    }

    #[test]
    fn test_loads_linear_json_model() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        let json = serde_json::json!({
            "kind": "linear_svm",
            "coef": vec![0.1; 19],
            "intercept": 0.0,
            "name": "svm"
        });
        write!(file, "{json}").unwrap();

        let model = ModelLoader::with_threads(2).load(file.path()).unwrap();
        assert_eq!(model.name(), "svm");
        assert_eq!(model.capability(), ModelCapability::DecisionScore);
    }
}
