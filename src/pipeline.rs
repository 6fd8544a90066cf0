//! End-to-end prediction pipeline over the loaded artifacts

use crate::config::ArtifactsConfig;
use crate::decision::DecisionPolicy;
use crate::encoders::{EncoderSet, EncoderTable};
use crate::error::Result;
use crate::feature_extractor::FeatureExtractor;
use crate::models::{ChurnModel, ModelCapability, ModelLoader, Predictor};
use crate::scaler::Scaler;
use crate::types::{PredictionResult, RawRecord, Threshold};
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded encoders, scaler and model.
///
/// Built once at startup and shared read-only across requests.
pub struct ChurnPipeline {
    encoders: EncoderSet,
    extractor: FeatureExtractor,
    scaler: Scaler,
    predictor: Predictor,
    policy: DecisionPolicy,
}

impl ChurnPipeline {
    /// Assemble a pipeline from already-loaded artifacts.
    pub fn new(encoders: EncoderSet, scaler: Scaler, model: Arc<dyn ChurnModel>) -> Result<Self> {
        encoders.validate()?;
        Ok(Self {
            encoders,
            extractor: FeatureExtractor::new(),
            scaler,
            predictor: Predictor::new(model),
            policy: DecisionPolicy,
        })
    }

    /// Load every artifact named in the configuration.
    pub fn load(artifacts: &ArtifactsConfig) -> Result<Self> {
        let encoders = EncoderSet::load(&artifacts.encoders)?;
        let scaler = Scaler::load(&artifacts.scaler)?;
        let model = ModelLoader::with_threads(artifacts.onnx_threads).load(&artifacts.model)?;

        let pipeline = Self::new(encoders, scaler, model)?;
        info!(
            model = %pipeline.predictor.model_name(),
            capability = ?pipeline.predictor.capability(),
            features = pipeline.extractor.feature_count(),
            "Churn pipeline ready"
        );
        Ok(pipeline)
    }

    /// Encode, order, scale, predict and decide for one record.
    pub fn predict(&self, record: &RawRecord, threshold: Threshold) -> Result<PredictionResult> {
        let codes = self.encoders.encode_record(record)?;
        let features = self.extractor.extract(&codes, record)?;
        let scaled = self.scaler.transform(&features)?;
        let probability = self.predictor.predict_proba(&scaled)?;
        let label = self.policy.decide(probability, threshold);

        debug!(
            label = %label,
            prob = probability,
            threshold = threshold.value(),
            "Record scored"
        );
        Ok(PredictionResult::new(label, probability, threshold))
    }

    pub fn encoder_keys(&self) -> Vec<String> {
        self.encoders.keys().map(str::to_string).collect()
    }

    pub fn encoder(&self, key: &str) -> Option<&EncoderTable> {
        self.encoders.get(key)
    }

    pub fn model_name(&self) -> &str {
        self.predictor.model_name()
    }

    pub fn capability(&self) -> ModelCapability {
        self.predictor.capability()
    }
}
