//! Linear classifiers stored as JSON coefficients

use crate::error::{ChurnError, Result};
use crate::models::inference::{sigmoid, ChurnModel, ModelCapability};
use crate::types::record::FEATURE_ORDER;
use serde::Deserialize;

/// Kind of fitted linear model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearKind {
    /// Logistic regression: probabilities and decision scores
    Logistic,
    /// Linear SVM: decision scores only
    LinearSvm,
}

/// `score = coef · x + intercept`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearModel {
    pub kind: LinearKind,
    pub coef: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_name() -> String {
    "linear".to_string()
}

impl LinearModel {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let model: LinearModel = serde_json::from_str(text)
            .map_err(|e| ChurnError::ArtifactLoad(format!("malformed linear model: {e}")))?;
        if model.coef.len() != FEATURE_ORDER.len() {
            return Err(ChurnError::ArtifactLoad(format!(
                "linear model has {} coefficients, expected {}",
                model.coef.len(),
                FEATURE_ORDER.len()
            )));
        }
        Ok(model)
    }

    fn score(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coef.len() {
            return Err(ChurnError::internal(format!(
                "model '{}' expects {} features, got {}",
                self.name,
                self.coef.len(),
                features.len()
            )));
        }
        let dot: f64 = self
            .coef
            .iter()
            .zip(features)
            .map(|(&w, &x)| w * x)
            .sum();
        Ok(dot + self.intercept)
    }
}

impl ChurnModel for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn positive_proba(&self, features: &[f64]) -> Option<Result<f64>> {
        match self.kind {
            LinearKind::Logistic => Some(self.score(features).map(sigmoid)),
            LinearKind::LinearSvm => None,
        }
    }

    fn decision_score(&self, features: &[f64]) -> Option<Result<f64>> {
        Some(self.score(features))
    }

    fn capability(&self) -> ModelCapability {
        match self.kind {
            LinearKind::Logistic => ModelCapability::Probability,
            LinearKind::LinearSvm => ModelCapability::DecisionScore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(kind: &str) -> LinearModel {
        let mut coef = vec![0.0; 19];
        coef[18] = 1.0; // customer_service_calls
        let json = serde_json::json!({ "kind": kind, "coef": coef, "intercept": -2.0 });
        LinearModel::from_json_str(&json.to_string()).unwrap()
    }

    #[test]
    fn test_logistic_exposes_probability() {
        let model = model("logistic");
        assert_eq!(model.capability(), ModelCapability::Probability);

        let mut x = vec![0.0f64; 19];
        x[18] = 2.0;
        let p = model.positive_proba(&x).unwrap().unwrap();
        assert_eq!(p, 0.5);
    }

    #[test]
    fn test_svm_exposes_only_score() {
        let model = model("linear_svm");
        assert_eq!(model.capability(), ModelCapability::DecisionScore);
        assert!(model.positive_proba(&[0.0; 19]).is_none());
        assert_eq!(model.decision_score(&[0.0; 19]).unwrap().unwrap(), -2.0);
    }

    #[test]
    fn test_coefficient_count_checked() {
        let json = r#"{"kind": "logistic", "coef": [1.0, 2.0], "intercept": 0.0}"#;
        assert!(matches!(
            LinearModel::from_json_str(json),
            Err(ChurnError::ArtifactLoad(_))
        ));
    }

    #[test]
    fn test_wrong_input_width_is_internal() {
        let err = model("logistic").decision_score(&[1.0; 3]).unwrap().unwrap_err();
        assert!(matches!(err, ChurnError::Internal(_)));
    }
}
