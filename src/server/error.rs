//! Error types for the server

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use super::views::render_error;
use crate::error::PipelineError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Pipeline(err) => match err.root() {
                PipelineError::BadInput(_) | PipelineError::UnknownCategory { .. } => {
                    StatusCode::BAD_REQUEST
                }
                PipelineError::ArtifactNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::BAD_REQUEST => self.to_string(),
            StatusCode::SERVICE_UNAVAILABLE => {
                tracing::warn!(detail = %self, "Prediction artifacts unavailable");
                "The model has not been trained yet. Run the training pipeline first.".to_string()
            }
            _ => {
                tracing::error!(detail = %self, "Internal server error");
                "An internal error occurred".to_string()
            }
        };

        (status, Html(render_error(status, &message))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        let bad = ServerError::from(PipelineError::BadInput("x".to_string()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = ServerError::from(
            PipelineError::ArtifactNotFound { path: PathBuf::from("model.bin") }.at_caller(),
        );
        assert_eq!(missing.status(), StatusCode::SERVICE_UNAVAILABLE);

        let other = ServerError::from(PipelineError::ModelNotFitted);
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ServerError::Internal("join".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
