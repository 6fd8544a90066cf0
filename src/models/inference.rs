//! Churn probability from a fitted model

use crate::error::{ChurnError, Result};
use crate::scaler::ScaledVector;
use std::sync::Arc;
use tracing::debug;

/// Neutral probability for models that expose neither probabilities nor scores
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Output a model can provide, in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCapability {
    /// Class probabilities; the positive-class column is used as is
    Probability,
    /// Raw decision score, mapped through a sigmoid
    DecisionScore,
    /// Neither; the predictor answers with a neutral probability
    LabelOnly,
}

/// A fitted binary classifier.
///
/// Each method returns `None` when the model lacks that capability.
pub trait ChurnModel: Send + Sync {
    fn name(&self) -> &str;

    /// Probability of the positive (churn) class
    fn positive_proba(&self, _features: &[f64]) -> Option<Result<f64>> {
        None
    }

    /// Signed distance to the decision boundary
    fn decision_score(&self, _features: &[f64]) -> Option<Result<f64>> {
        None
    }

    fn capability(&self) -> ModelCapability;
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Turns model output into a churn probability
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn ChurnModel>,
}

impl Predictor {
    pub fn new(model: Arc<dyn ChurnModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn capability(&self) -> ModelCapability {
        self.model.capability()
    }

    /// Probability of churn in [0, 1].
    ///
    /// Tries class probabilities, then the decision score, then falls back to
    /// [`NEUTRAL_PROBABILITY`]. A step is skipped only when the model lacks it.
    pub fn predict_proba(&self, features: &ScaledVector) -> Result<f64> {
        let (p, source) = if let Some(proba) = self.model.positive_proba(features) {
            (proba?, ModelCapability::Probability)
        } else if let Some(score) = self.model.decision_score(features) {
            (sigmoid(score?), ModelCapability::DecisionScore)
        } else {
            (NEUTRAL_PROBABILITY, ModelCapability::LabelOnly)
        };

        if !p.is_finite() {
            return Err(ChurnError::internal(format!(
                "model '{}' produced a non-finite probability",
                self.model.name()
            )));
        }

        debug!(model = %self.model.name(), source = ?source, prob = p, "Churn probability");
        Ok(p.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Fixed {
        proba: Option<f64>,
        score: Option<f64>,
    }

    impl ChurnModel for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn positive_proba(&self, _: &[f64]) -> Option<Result<f64>> {
            self.proba.map(Ok)
        }

        fn decision_score(&self, _: &[f64]) -> Option<Result<f64>> {
            self.score.map(Ok)
        }

        fn capability(&self) -> ModelCapability {
            match (self.proba, self.score) {
                (Some(_), _) => ModelCapability::Probability,
                (None, Some(_)) => ModelCapability::DecisionScore,
                _ => ModelCapability::LabelOnly,
            }
        }
    }

    fn predictor(proba: Option<f64>, score: Option<f64>) -> Predictor {
        Predictor::new(Arc::new(Fixed { proba, score }))
    }

    #[test]
    fn test_probability_preferred_over_score() {
        let p = predictor(Some(0.8), Some(-10.0))
            .predict_proba(&vec![0.0; 19])
            .unwrap();
        assert_eq!(p, 0.8);
    }

    #[test]
    fn test_score_mapped_through_sigmoid() {
        let p = predictor(None, Some(0.0)).predict_proba(&vec![0.0; 19]).unwrap();
        assert_eq!(p, 0.5);

        let p = predictor(None, Some(2.0)).predict_proba(&vec![0.0; 19]).unwrap();
        assert!((p - 0.880_797).abs() < 1e-6);
    }

    #[test]
    fn test_label_only_model_is_neutral() {
        let predictor = predictor(None, None);
        assert_eq!(predictor.capability(), ModelCapability::LabelOnly);
        assert_eq!(predictor.predict_proba(&vec![0.0; 19]).unwrap(), 0.5);
    }

    #[test]
    fn test_non_finite_output_is_internal() {
        let err = predictor(Some(f64::NAN), None)
            .predict_proba(&vec![0.0; 19])
            .unwrap_err();
        assert!(matches!(err, ChurnError::Internal(_)));
    }

    #[test]
    fn test_errors_propagate_without_fallback() {
        struct Broken;
        impl ChurnModel for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn positive_proba(&self, _: &[f64]) -> Option<Result<f64>> {
                Some(Err(ChurnError::internal("session failed")))
            }
            fn decision_score(&self, _: &[f64]) -> Option<Result<f64>> {
                Some(Ok(0.0))
            }
            fn capability(&self) -> ModelCapability {
                ModelCapability::Probability
            }
        }

        let err = Predictor::new(Arc::new(Broken))
            .predict_proba(&vec![0.0; 19])
            .unwrap_err();
        assert!(err.to_string().contains("session failed"));
    }

    proptest! {
        #[test]
        fn prop_probability_in_unit_interval(
            proba in proptest::option::of(-2.0f64..3.0),
            score in proptest::option::of(-1e3f64..1e3),
        ) {
            let p = predictor(proba, score).predict_proba(&vec![0.0; 19]).unwrap();
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }
}
