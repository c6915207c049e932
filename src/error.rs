//! Error types for the nli-probe pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, NliError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum NliError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Malformed record in {} at line {line}: {reason}", .path.display())]
    DataFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Column not found: {0}")]
    FeatureNotFound(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("Render error: {0}")]
    RenderError(String),
}

impl NliError {
    /// Map an I/O failure on `path` to `FileNotFound` when the path is missing.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            NliError::FileNotFound(path.into())
        } else {
            NliError::IoError(err)
        }
    }
}

impl From<polars::error::PolarsError> for NliError {
    fn from(err: polars::error::PolarsError) -> Self {
        NliError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for NliError {
    fn from(err: serde_json::Error) -> Self {
        NliError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for NliError {
    fn from(err: ndarray::ShapeError) -> Self {
        NliError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
