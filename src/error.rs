//! Error types for dataset operations

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dataset operations
#[derive(Error, Debug)]
pub enum NataError {
    #[error("No backend found for source: {}", .0.display())]
    NoBackendFound(PathBuf),

    #[error("Incompatible grid: {0}")]
    IncompatibleGrid(String),

    #[error("Incompatible axis '{axis}': {reason}")]
    IncompatibleAxis { axis: String, reason: String },

    #[error("Incompatible particle quantities: {0}")]
    IncompatibleQuantity(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Duplicate iteration: {0}")]
    DuplicateIteration(u64),

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Iteration not found: {0}")]
    KeyNotFound(u64),

    #[error("Invalid backend '{backend}': {reason}")]
    InvalidBackend { backend: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Specialized Result type for dataset operations
pub type Result<T> = std::result::Result<T, NataError>;

impl NataError {
    /// Create an IncompatibleAxis error.
    pub fn incompatible_axis(axis: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IncompatibleAxis {
            axis: axis.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidBackend error.
    pub fn invalid_backend(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBackend {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for NataError {
    fn from(err: serde_json::Error) -> Self {
        NataError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for NataError {
    fn from(err: ndarray::ShapeError) -> Self {
        NataError::ShapeMismatch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = NataError::NoBackendFound(PathBuf::from("/data/e1-000010.h5"));
        assert_eq!(
            err.to_string(),
            "No backend found for source: /data/e1-000010.h5"
        );

        let err = NataError::incompatible_axis("x1", "unit differs");
        assert_eq!(err.to_string(), "Incompatible axis 'x1': unit differs");

        let err = NataError::IndexOutOfRange { index: 3, len: 2 };
        assert_eq!(err.to_string(), "Index 3 out of range for length 2");
    }

    #[test]
    fn test_from_serde_json() {
        let err: NataError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, NataError::Serialization(_)));
    }
}
