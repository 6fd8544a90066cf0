//! Fitted numeric scaling of the feature vector.
//!
//! Parameters come from the scaler artifact, a JSON document tagged by `kind`:
//!
//! ```json
//! { "kind": "standard", "mean": [...], "scale": [...], "feature_names": [...] }
//! { "kind": "min_max", "scale": [...], "min": [...] }
//! ```

use crate::error::{ChurnError, Result};
use crate::feature_extractor::FeatureVector;
use crate::types::record::FEATURE_ORDER;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Scaled model input, same length and order as the feature vector
pub type ScaledVector = Vec<f64>;

/// Per-column transform parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { scale: Vec<f64>, min: Vec<f64> },
}

#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    #[serde(flatten)]
    params: ScalerParams,
    /// Column names recorded at fit time, when available
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

/// Fitted scaler, immutable after load
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    params: ScalerParams,
}

impl Scaler {
    /// Create a scaler, checking parameter lengths against the feature schema.
    pub fn new(params: ScalerParams) -> Result<Self> {
        let expected = FEATURE_ORDER.len();
        let lengths = match &params {
            ScalerParams::Standard { mean, scale } => [mean.len(), scale.len()],
            ScalerParams::MinMax { scale, min } => [scale.len(), min.len()],
        };
        if lengths.iter().any(|&len| len != expected) {
            return Err(ChurnError::ArtifactLoad(format!(
                "scaler parameters have lengths {lengths:?}, expected {expected}"
            )));
        }
        Ok(Self { params })
    }

    /// Load the scaler artifact from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::ArtifactLoad(format!("cannot read scaler {}: {e}", path.display()))
        })?;
        let scaler = Self::from_json_str(&text)?;

        info!(path = %path.display(), kind = scaler.kind(), "Scaler loaded");
        Ok(scaler)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let artifact: ScalerArtifact = serde_json::from_str(text)
            .map_err(|e| ChurnError::ArtifactLoad(format!("malformed scaler artifact: {e}")))?;

        if let Some(names) = &artifact.feature_names {
            let expected: Vec<&str> = FEATURE_ORDER.iter().map(|c| c.name).collect();
            if names.iter().map(String::as_str).ne(expected.iter().copied()) {
                return Err(ChurnError::ArtifactLoad(format!(
                    "scaler was fit on columns {names:?}, expected {expected:?}"
                )));
            }
        }

        Self::new(artifact.params)
    }

    pub fn kind(&self) -> &'static str {
        match self.params {
            ScalerParams::Standard { .. } => "standard",
            ScalerParams::MinMax { .. } => "min_max",
        }
    }

    /// Apply the fitted transform to every slot.
    pub fn transform(&self, features: &FeatureVector) -> Result<ScaledVector> {
        if features.len() != FEATURE_ORDER.len() {
            return Err(ChurnError::internal(format!(
                "feature vector has {} slots, scaler expects {}",
                features.len(),
                FEATURE_ORDER.len()
            )));
        }

        let scaled = match &self.params {
            ScalerParams::Standard { mean, scale } => features
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(&x, (&m, &s))| {
                    // Constant columns are fit with a unit scale
                    let s = if s == 0.0 { 1.0 } else { s };
                    (x - m) / s
                })
                .collect(),
            ScalerParams::MinMax { scale, min } => features
                .iter()
                .zip(scale.iter().zip(min))
                .map(|(&x, (&s, &m))| x * s + m)
                .collect(),
        };
        Ok(scaled)
    }
}
