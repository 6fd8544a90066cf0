//! Churn Prediction Service Library
//!
//! Serves a pre-trained customer churn classifier over HTTP. Records are
//! encoded, laid out in training column order, scaled, scored by the model and
//! classified against a caller-supplied threshold.

pub mod api;
pub mod client;
pub mod config;
pub mod decision;
pub mod encoders;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod scaler;
pub mod types;

pub use config::AppConfig;
pub use encoders::{EncoderSet, EncoderTable};
pub use error::{ChurnError, Result};
pub use feature_extractor::FeatureExtractor;
pub use pipeline::ChurnPipeline;
pub use scaler::Scaler;
pub use types::{CustomerRecord, Label, PredictionResult, RawRecord, Threshold};
