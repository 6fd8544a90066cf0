//! Probability-to-label decision

use crate::types::prediction::{Label, Threshold};

/// Classifies a churn probability against a caller-supplied threshold
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionPolicy;

impl DecisionPolicy {
    /// `Churn` when `probability >= threshold`, `No Churn` otherwise.
    pub fn decide(&self, probability: f64, threshold: Threshold) -> Label {
        if probability >= threshold.value() {
            Label::Churn
        } else {
            Label::NoChurn
        }
    }
}
