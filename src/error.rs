//! Error types for the churn service

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Errors raised while loading artifacts or serving a prediction
#[derive(Error, Debug)]
pub enum ChurnError {
    /// A required artifact is missing, unreadable or malformed (startup only)
    #[error("artifact load failed: {0}")]
    ArtifactLoad(String),

    /// The caller sent a record the pipeline cannot encode
    #[error("{0}")]
    InvalidInput(String),

    /// Decision threshold outside [0, 1]
    #[error("threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    /// No encoder table registered under this key
    #[error("no encoder for '{0}'")]
    UnknownEncoder(String),

    /// Failure not attributable to the caller (artifact/vector shape mismatch, model error)
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChurnError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True when the caller can fix the request and retry.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::InvalidThreshold(_) | Self::UnknownEncoder(_)
        )
    }
}

impl From<ort::Error> for ChurnError {
    fn from(e: ort::Error) -> Self {
        Self::Internal(format!("onnx runtime: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(ChurnError::invalid_input("bad").is_client_error());
        assert!(ChurnError::InvalidThreshold(1.5).is_client_error());
        assert!(ChurnError::UnknownEncoder("x".into()).is_client_error());
        assert!(!ChurnError::internal("shape").is_client_error());
        assert!(!ChurnError::ArtifactLoad("missing".into()).is_client_error());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ChurnError::UnknownEncoder("area".into()).to_string(),
            "no encoder for 'area'"
        );
        assert_eq!(
            ChurnError::InvalidThreshold(2.0).to_string(),
            "threshold must be within [0, 1], got 2"
        );
    }
}
