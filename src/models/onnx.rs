//! ONNX churn model served through ONNX Runtime

use crate::error::{ChurnError, Result};
use crate::models::inference::{ChurnModel, ModelCapability};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Loaded ONNX model with the output it is read from
pub struct OnnxModel {
    name: String,
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: Option<String>,
    capability: ModelCapability,
}

impl OnnxModel {
    /// Load an ONNX model and resolve which output carries the churn signal.
    pub fn load<P: AsRef<Path>>(path: P, intra_threads: usize) -> Result<Self> {
        let path = path.as_ref();
        let load_err = |e: ort::Error| {
            ChurnError::ArtifactLoad(format!("cannot load model {}: {e}", path.display()))
        };

        let session = Session::builder()
            .map_err(load_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_err)?
            .with_intra_threads(intra_threads)
            .map_err(load_err)?
            .commit_from_file(path)
            .map_err(load_err)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let (output_name, capability) = resolve_output(&output_names);

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx")
            .to_string();

        info!(
            model = %name,
            input = %input_name,
            output = ?output_name,
            capability = ?capability,
            "ONNX model loaded"
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            output_name,
            capability,
        })
    }

    /// Run the session and read the churn column of the selected output.
    fn run(&self, features: &[f64]) -> Result<f64> {
        let output_name = self
            .output_name
            .as_deref()
            .ok_or_else(|| ChurnError::internal("model has no usable output"))?;

        // float_input is float32, shape [1, num_features]
        let input: Vec<f32> = features.iter().map(|&x| x as f32).collect();
        let shape = vec![1_i64, input.len() as i64];
        let input_tensor = Tensor::from_array((shape, input))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ChurnError::internal(format!("session lock poisoned: {e}")))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        extract_positive(&outputs, output_name, &self.name)
    }
}

impl ChurnModel for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn positive_proba(&self, features: &[f64]) -> Option<Result<f64>> {
        (self.capability == ModelCapability::Probability).then(|| self.run(features))
    }

    fn decision_score(&self, features: &[f64]) -> Option<Result<f64>> {
        (self.capability == ModelCapability::DecisionScore).then(|| self.run(features))
    }

    fn capability(&self) -> ModelCapability {
        self.capability
    }
}

/// Pick the output to read from the graph's output names.
///
/// Probability outputs win over score outputs; label outputs are never used.
pub(crate) fn resolve_output(names: &[String]) -> (Option<String>, ModelCapability) {
    if let Some(name) = find_output(names, |n| n.contains("prob")) {
        return (Some(name), ModelCapability::Probability);
    }
    if let Some(name) = find_output(names, |n| {
        n.contains("score") || n.contains("decision") || n.contains("variable")
    }) {
        return (Some(name), ModelCapability::DecisionScore);
    }
    (None, ModelCapability::LabelOnly)
}

fn find_output(names: &[String], pred: impl Fn(&str) -> bool) -> Option<String> {
    names
        .iter()
        .find(|n| {
            let lower = n.to_lowercase();
            !lower.contains("label") && pred(&lower)
        })
        .cloned()
}

/// Read the churn value from the named session output.
fn extract_positive(outputs: &SessionOutputs, output_name: &str, model_name: &str) -> Result<f64> {
    let output = outputs
        .get(output_name)
        .ok_or_else(|| ChurnError::internal(format!("output '{output_name}' missing")))?;
    positive_from_value(output, model_name)
}

/// Handles tensor outputs and seq(map(int64, float)) outputs.
fn positive_from_value(output: &DynValue, model_name: &str) -> Result<f64> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        let value = positive_from_tensor(&dims, data)?;
        debug!(model = %model_name, value = value, "Extracted from tensor");
        return Ok(value);
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return extract_from_sequence_map(output, model_name);
    }

    Err(ChurnError::internal(format!(
        "unsupported output type {dtype:?}"
    )))
}

/// Positive-class value from a `[batch, classes]`, `[classes]` or `[batch]` tensor.
pub(crate) fn positive_from_tensor(dims: &[i64], data: &[f32]) -> Result<f64> {
    let classes = dims.last().copied().unwrap_or(0);
    let value = match (dims.len(), classes) {
        (1 | 2, c) if c >= 2 => data.get(1),
        (1 | 2, 1) => data.first(),
        _ => None,
    };
    value
        .map(|&v| v as f64)
        .ok_or_else(|| ChurnError::internal(format!("unexpected output shape {dims:?}")))
}

fn extract_from_sequence_map(output: &DynValue, model_name: &str) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| ChurnError::internal(format!("failed to downcast to sequence: {e}")))?;
    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let first = maps
        .first()
        .ok_or_else(|| ChurnError::internal("empty probability sequence"))?;

    let pairs = first.try_extract_key_values::<i64, f32>()?;
    let p = positive_from_class_map(&pairs)?;
    debug!(model = %model_name, prob = p, "Extracted from seq(map)");
    Ok(p)
}

/// Class 1 probability from a ZipMap entry, or its complement from class 0.
pub(crate) fn positive_from_class_map(pairs: &[(i64, f32)]) -> Result<f64> {
    if let Some((_, p)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Ok(*p as f64);
    }
    if let Some((_, p)) = pairs.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - *p as f64);
    }
    Err(ChurnError::internal("no class probability in map"))
}
