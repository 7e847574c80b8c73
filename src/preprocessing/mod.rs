//! Data preprocessing module
//!
//! Provides the column-wise transform applied before training and prediction:
//! - Missing value imputation
//! - Feature scaling (StandardScaler, MinMaxScaler)
//! - One-hot categorical encoding
//! - The transformation stage that fits and persists the preprocessor

mod config;
mod imputer;
mod scaler;
mod encoder;
mod pipeline;
pub mod transformation;

pub use config::PreprocessingConfig;
pub use imputer::{Imputer, ImputeStrategy, ImputeValue};
pub use scaler::{Scaler, ScalerParams, ScalerType};
pub use encoder::{HandleUnknown, OneHotEncoder};
pub use pipeline::DataPreprocessor;
pub use transformation::{target_values, DataTransformation, TransformedSplits};
