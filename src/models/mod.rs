//! Fitted churn model and probability extraction

pub mod inference;
pub mod linear;
pub mod loader;
pub mod onnx;

pub use inference::{ChurnModel, ModelCapability, Predictor};
pub use linear::LinearModel;
pub use loader::ModelLoader;
pub use onnx::OnnxModel;
