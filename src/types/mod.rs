//! Type definitions for the churn service

pub mod prediction;
pub mod record;

pub use prediction::{Label, PredictionResult, Threshold};
pub use record::{Column, ColumnKind, CustomerRecord, RawRecord, FEATURE_ORDER};
