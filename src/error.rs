//! Error types for the regression pipeline

use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Unknown category {value:?} in column {column}")]
    UnknownCategory { column: String, value: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Training error: {0}")]
    Training(String),

    #[error("No model reached the quality floor: best was {best_model} with R² {best_score:.4} (floor {floor})")]
    NoAcceptableModel {
        best_model: String,
        best_score: f64,
        floor: f64,
    },

    #[error("Artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Bad input: {0}")]
    BadInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{source} (at {file}:{line})")]
    Located {
        #[source]
        source: Box<PipelineError>,
        file: &'static str,
        line: u32,
    },
}

impl PipelineError {
    /// Attach the caller's file and line to this error.
    #[track_caller]
    pub fn at_caller(self) -> Self {
        if matches!(self, PipelineError::Located { .. }) {
            return self;
        }
        let location = Location::caller();
        PipelineError::Located {
            source: Box::new(self),
            file: location.file(),
            line: location.line(),
        }
    }

    /// The underlying error with any location wrappers removed.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Located { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension for attaching call-site context to fallible results.
pub trait Locate<T> {
    fn located(self) -> Result<T>;
}

impl<T, E: Into<PipelineError>> Locate<T> for std::result::Result<T, E> {
    #[track_caller]
    fn located(self) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(err.into().at_caller()),
        }
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::Data(format!("invalid shape: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::Data("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_located_records_call_site() {
        let result: std::result::Result<(), PipelineError> =
            Err(PipelineError::BadInput("missing field".to_string()));
        let err = result.located().unwrap_err();

        let message = err.to_string();
        assert!(message.contains("missing field"));
        assert!(message.contains("error.rs:"), "message was {}", message);
        assert!(matches!(err.root(), PipelineError::BadInput(_)));
    }

    #[test]
    fn test_located_is_not_nested_twice() {
        let err = PipelineError::ModelNotFitted.at_caller().at_caller();
        match err {
            PipelineError::Located { source, .. } => {
                assert!(matches!(*source, PipelineError::ModelNotFitted))
            }
            other => panic!("expected located error, got {:?}", other),
        }
    }
}
