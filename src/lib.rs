//! Regression pipeline - train a tabular regressor and serve predictions
//!
//! The offline phase ingests a CSV dataset, splits it, fits a preprocessing
//! transform, searches a roster of regressors and persists the best one. The
//! online phase loads those artifacts to answer single predictions through a
//! small web form or the command line.
//!
//! # Modules
//!
//! ## Offline pipeline
//! - [`ingestion`] - Read, split and persist the dataset
//! - [`preprocessing`] - Imputation, one-hot encoding and scaling
//! - [`training`] - Regressor roster, grid search and model selection
//! - [`pipeline`] - Runs the three stages in order
//!
//! ## Serving
//! - [`predict`] - Prediction from persisted artifacts
//! - [`server`] - HTML form over HTTP
//! - [`cli`] - Command-line interface
//!
//! ## Shared
//! - [`config`] - Pipeline configuration and artifact locations
//! - [`artifacts`] - Persisted preprocessor and model
//! - [`logging`] - Console and file logging

// Core error handling
pub mod error;

// Shared
pub mod artifacts;
pub mod config;
pub mod logging;

// Offline pipeline
pub mod ingestion;
pub mod preprocessing;
pub mod training;
pub mod pipeline;

// Serving
pub mod predict;
pub mod server;
pub mod cli;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Locate, PipelineError, Result};

    // Configuration
    pub use crate::config::{ArtifactPaths, FeatureSchema, IngestionConfig, PipelineConfig};

    // Offline pipeline
    pub use crate::ingestion::DataIngestion;
    pub use crate::pipeline::{TrainingPipeline, TrainingSummary};
    pub use crate::preprocessing::{DataPreprocessor, DataTransformation, PreprocessingConfig, TransformedSplits};
    pub use crate::training::{
        ModelKind, ModelTrainer, ParamGrid, ParamSet, Regressor, TrainedModel, TrainerConfig,
        TrainerOutcome,
    };

    // Serving
    pub use crate::predict::{CustomData, PredictPipeline};
    pub use crate::server::ServerConfig;
}
