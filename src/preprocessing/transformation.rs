//! Data transformation stage
//!
//! Fits the preprocessor on the train split, transforms both splits and
//! persists the fitted preprocessor next to the other artifacts.

use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use super::{DataPreprocessor, PreprocessingConfig};
use crate::artifacts::{save_object, PreprocessorArtifact};
use crate::config::{ArtifactPaths, FeatureSchema};
use crate::error::{PipelineError, Result};
use crate::ingestion::read_csv;

/// Transformed train and test matrices; the target is the last column
#[derive(Debug, Clone)]
pub struct TransformedSplits {
    pub train: Array2<f64>,
    pub test: Array2<f64>,
    /// Feature names, without the target
    pub feature_names: Vec<String>,
    pub preprocessor_path: PathBuf,
}

impl TransformedSplits {
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Transformation stage of the offline pipeline
pub struct DataTransformation {
    schema: FeatureSchema,
    config: PreprocessingConfig,
    paths: ArtifactPaths,
}

impl DataTransformation {
    pub fn new(schema: FeatureSchema, config: PreprocessingConfig, paths: ArtifactPaths) -> Self {
        Self {
            schema,
            config,
            paths,
        }
    }

    /// Fit on `train_path`, transform both splits and save the preprocessor
    pub fn initiate(&self, train_path: &Path, test_path: &Path) -> Result<TransformedSplits> {
        let start = Instant::now();
        let train_df = read_csv(train_path)?;
        let test_df = read_csv(test_path)?;
        info!(
            train_rows = train_df.height(),
            test_rows = test_df.height(),
            "Read train and test data completed"
        );

        let mut preprocessor = DataPreprocessor::with_config(&self.schema, self.config.clone());
        info!("Applying preprocessing object on training and testing frames");
        let train_features = preprocessor.fit_transform(&train_df)?;
        let test_features = preprocessor.transform(&test_df)?;

        let train = append_target(train_features, &target_values(&train_df, &self.schema)?)?;
        let test = append_target(test_features, &target_values(&test_df, &self.schema)?)?;

        let preprocessor_path = self.paths.preprocessor();
        let feature_names = preprocessor.feature_names_out().to_vec();
        save_object(
            &preprocessor_path,
            &PreprocessorArtifact {
                schema: self.schema.clone(),
                preprocessor,
            },
        )?;
        info!(
            path = %preprocessor_path.display(),
            features = feature_names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Saved preprocessing object"
        );

        Ok(TransformedSplits {
            train,
            test,
            feature_names,
            preprocessor_path,
        })
    }
}

/// Target column as dense `f64` values; nulls are rejected
pub fn target_values(df: &DataFrame, schema: &FeatureSchema) -> Result<Vec<f64>> {
    let name = &schema.target_column;
    let column = df
        .column(name)
        .map_err(|_| PipelineError::SchemaMismatch(format!("missing target column {}", name)))?;
    if !super::pipeline::is_numeric_dtype(column.dtype()) {
        return Err(PipelineError::SchemaMismatch(format!(
            "target column {} must be numeric, found {}",
            name,
            column.dtype()
        )));
    }

    let casted = column.cast(&DataType::Float64)?;
    casted
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                PipelineError::SchemaMismatch(format!(
                    "target column {} is null at row {}",
                    name, row
                ))
            })
        })
        .collect()
}

fn append_target(features: Array2<f64>, target: &[f64]) -> Result<Array2<f64>> {
    let target = Array2::from_shape_vec((target.len(), 1), target.to_vec())?;
    Ok(concatenate(Axis(1), &[features.view(), target.view()])?)
}
