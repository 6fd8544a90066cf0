//! Prediction result and decision threshold

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicted class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Churn")]
    Churn,
    #[serde(rename = "No Churn")]
    NoChurn,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Churn => "Churn",
            Label::NoChurn => "No Churn",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision threshold, guaranteed to lie in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    pub const DEFAULT: Threshold = Threshold(0.5);

    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ChurnError::InvalidThreshold(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Response body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: Label,
    /// Churn probability rounded to 6 decimals
    pub prob_churn: f64,
    pub decision_threshold: f64,
}

impl PredictionResult {
    pub fn new(label: Label, probability: f64, threshold: Threshold) -> Self {
        Self {
            prediction: label,
            prob_churn: round6(probability),
            decision_threshold: threshold.value(),
        }
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
