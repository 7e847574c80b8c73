//! Column-wise preprocessing pipeline
//!
//! Numeric branch: impute, then scale. Categorical branch: impute, one-hot
//! encode, then scale the indicators. The output is a dense matrix with the
//! numeric columns first (schema order) followed by the indicator columns.

use crate::config::FeatureSchema;
use crate::error::{PipelineError, Result};
use super::{
    config::PreprocessingConfig,
    encoder::OneHotEncoder,
    imputer::Imputer,
    scaler::{Scaler, ScalerType},
};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Fitted numeric and categorical branches
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedBranches {
    numeric_imputer: Imputer,
    numeric_scaler: Scaler,
    categorical_imputer: Imputer,
    encoder: OneHotEncoder,
    categorical_scaler: Scaler,
}

/// Main data preprocessing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    branches: Option<FittedBranches>,
    feature_names_out: Vec<String>,
    /// Seconds spent in the last fit call
    fit_time: Option<f64>,
}

impl DataPreprocessor {
    /// Create a preprocessor for `schema` with default configuration
    pub fn new(schema: &FeatureSchema) -> Self {
        Self::with_config(schema, PreprocessingConfig::default())
    }

    /// Create a preprocessor for `schema` with custom configuration
    pub fn with_config(schema: &FeatureSchema, config: PreprocessingConfig) -> Self {
        Self {
            config,
            numeric_columns: schema.numeric_columns.clone(),
            categorical_columns: schema.categorical_columns.clone(),
            branches: None,
            feature_names_out: Vec::new(),
            fit_time: None,
        }
    }

    /// Learn imputation values, scaling parameters and vocabularies from `df`
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();

        let numeric = self.numeric_frame(df)?;
        let categorical = self.categorical_frame(df)?;
        let numeric_cols = as_strs(&self.numeric_columns);
        let categorical_cols = as_strs(&self.categorical_columns);

        let mut numeric_imputer = Imputer::new(self.config.numeric_impute_strategy.clone());
        let numeric = numeric_imputer.fit_transform(&numeric, &numeric_cols)?;
        let mut numeric_scaler = Scaler::new(self.config.scaler_type.clone());
        numeric_scaler.fit(&numeric, &numeric_cols)?;

        let mut categorical_imputer =
            Imputer::new(self.config.categorical_impute_strategy.clone());
        let categorical = categorical_imputer.fit_transform(&categorical, &categorical_cols)?;
        let mut encoder = OneHotEncoder::new(self.config.handle_unknown);
        let encoded = encoder.fit_transform(&categorical, &categorical_cols)?;
        let indicator_names = encoder.output_names();
        let mut categorical_scaler =
            Scaler::new(ScalerType::Standard).with_mean(self.config.center_categorical);
        categorical_scaler.fit(&encoded, &as_strs(&indicator_names))?;

        self.feature_names_out = self
            .numeric_columns
            .iter()
            .cloned()
            .chain(indicator_names)
            .collect();
        self.branches = Some(FittedBranches {
            numeric_imputer,
            numeric_scaler,
            categorical_imputer,
            encoder,
            categorical_scaler,
        });
        self.fit_time = Some(start.elapsed().as_secs_f64());

        debug!(
            rows = df.height(),
            features_out = self.feature_names_out.len(),
            "Preprocessor fitted"
        );
        Ok(self)
    }

    /// Apply the fitted transform; never refits
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let branches = self.branches.as_ref().ok_or(PipelineError::ModelNotFitted)?;

        let numeric = self.numeric_frame(df)?;
        let numeric = branches.numeric_imputer.transform(&numeric)?;
        let numeric = branches.numeric_scaler.transform(&numeric)?;

        let categorical = self.categorical_frame(df)?;
        let categorical = branches.categorical_imputer.transform(&categorical)?;
        let encoded = branches.encoder.transform(&categorical)?;
        let encoded = branches.categorical_scaler.transform(&encoded)?;

        let mut col_data: Vec<Vec<f64>> = Vec::with_capacity(self.feature_names_out.len());
        for name in &self.numeric_columns {
            col_data.push(dense_values(&numeric, name)?);
        }
        for name in branches.encoder.output_names() {
            col_data.push(dense_values(&encoded, &name)?);
        }

        let n_rows = df.height();
        Ok(Array2::from_shape_fn((n_rows, col_data.len()), |(r, c)| col_data[c][r]))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    pub fn is_fitted(&self) -> bool {
        self.branches.is_some()
    }

    /// Output column names, fixed at fit time
    pub fn feature_names_out(&self) -> &[String] {
        &self.feature_names_out
    }

    pub fn n_features_out(&self) -> usize {
        self.feature_names_out.len()
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    /// Sorted vocabulary per categorical column; empty before fit
    pub fn vocabularies(&self) -> Vec<(String, Vec<String>)> {
        self.branches
            .as_ref()
            .map(|b| b.encoder.vocabularies().to_vec())
            .unwrap_or_default()
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    /// Numeric schema columns cast to `Float64`
    fn numeric_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.numeric_columns.len());
        for name in &self.numeric_columns {
            let column = schema_column(df, name)?;
            if !is_numeric_dtype(column.dtype()) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "column {} must be numeric, found {}",
                    name,
                    column.dtype()
                )));
            }
            columns.push(column.cast(&DataType::Float64)?);
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Categorical schema columns cast to `String`
    fn categorical_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.categorical_columns.len());
        for name in &self.categorical_columns {
            columns.push(schema_column(df, name)?.cast(&DataType::String)?);
        }
        Ok(DataFrame::new(columns)?)
    }
}

fn schema_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| PipelineError::SchemaMismatch(format!("missing column {}", name)))
}

fn dense_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let ca = df.column(name)?.f64()?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

fn as_strs(names: &[String]) -> Vec<&str> {
    names.iter().map(|s| s.as_str()).collect()
}

/// Check if dtype is numeric
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Null
    )
}
