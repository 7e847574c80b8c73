//! Prediction from persisted artifacts
//!
//! [`CustomData`] holds one observation as raw strings, the way it arrives
//! from a form or the command line. [`PredictPipeline`] loads the fitted
//! preprocessor and the winning model and turns observations into
//! predictions without refitting anything.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::{load_object, ModelArtifact, PreprocessorArtifact};
use crate::config::{ArtifactPaths, FeatureSchema};
use crate::error::{PipelineError, Result};
use crate::training::Regressor;

/// A single observation keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    fields: BTreeMap<String, String>,
}

impl CustomData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a `name=value` assignment
    pub fn parse_assignment(assignment: &str) -> Result<(String, String)> {
        match assignment.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(PipelineError::BadInput(format!(
                "expected name=value, got {:?}",
                assignment
            ))),
        }
    }

    /// Build from `name=value` assignments
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Result<Self> {
        let mut data = Self::new();
        for assignment in assignments {
            let (name, value) = Self::parse_assignment(assignment.as_ref())?;
            data.insert(name, value);
        }
        Ok(data)
    }

    /// One-row frame with the schema's feature columns.
    ///
    /// Every feature must be present and non-empty, numeric features must
    /// parse as numbers and fields outside the schema are rejected.
    pub fn to_frame(&self, schema: &FeatureSchema) -> Result<DataFrame> {
        let features = schema.feature_columns();
        if let Some(extra) = self.fields.keys().find(|k| !features.contains(&k.as_str())) {
            return Err(PipelineError::BadInput(format!("unexpected field {}", extra)));
        }

        let mut columns = Vec::with_capacity(features.len());
        for name in &schema.numeric_columns {
            let raw = self.required(name)?;
            let value: f64 = raw.parse().map_err(|_| {
                PipelineError::BadInput(format!("{} must be a number, got {:?}", name, raw))
            })?;
            if !value.is_finite() {
                return Err(PipelineError::BadInput(format!("{} must be finite", name)));
            }
            columns.push(Column::new(name.as_str().into(), vec![value]));
        }
        for name in &schema.categorical_columns {
            let raw = self.required(name)?;
            columns.push(Column::new(name.as_str().into(), vec![raw.to_string()]));
        }

        Ok(DataFrame::new(columns)?)
    }

    fn required(&self, name: &str) -> Result<&str> {
        match self.get(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            Some(_) => Err(PipelineError::BadInput(format!("{} is empty", name))),
            None => Err(PipelineError::BadInput(format!("missing field {}", name))),
        }
    }
}

impl From<HashMap<String, String>> for CustomData {
    fn from(map: HashMap<String, String>) -> Self {
        Self {
            fields: map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CustomData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Schema plus category vocabularies, for rendering input forms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSchema {
    pub schema: FeatureSchema,
    pub vocabularies: Vec<(String, Vec<String>)>,
}

impl FormSchema {
    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        self.vocabularies
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, values)| values.as_slice())
    }
}

/// Loads the persisted preprocessor and model for inference
#[derive(Debug, Clone)]
pub struct PredictPipeline {
    preprocessor_path: PathBuf,
    model_path: PathBuf,
}

impl PredictPipeline {
    pub fn new(preprocessor_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            preprocessor_path: preprocessor_path.into(),
            model_path: model_path.into(),
        }
    }

    pub fn from_paths(paths: &ArtifactPaths) -> Self {
        Self::new(paths.preprocessor(), paths.model())
    }

    pub fn preprocessor_path(&self) -> &Path {
        &self.preprocessor_path
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Predict one observation
    pub fn predict(&self, data: &CustomData) -> Result<f64> {
        let (preprocessor, model) = self.load()?;
        let frame = data.to_frame(&preprocessor.schema)?;
        let predictions = Self::run(&preprocessor, &model, &frame)?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| PipelineError::Training("model returned no prediction".to_string()))
    }

    /// Predict every row of `df`; columns beyond the schema are ignored
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let (preprocessor, model) = self.load()?;
        Self::run(&preprocessor, &model, df)
    }

    /// Schema and vocabularies of the persisted preprocessor
    pub fn schema(&self) -> Result<FormSchema> {
        let artifact: PreprocessorArtifact = load_object(&self.preprocessor_path)?;
        Ok(FormSchema {
            vocabularies: artifact.preprocessor.vocabularies(),
            schema: artifact.schema,
        })
    }

    fn load(&self) -> Result<(PreprocessorArtifact, ModelArtifact)> {
        let preprocessor: PreprocessorArtifact = load_object(&self.preprocessor_path)?;
        let model: ModelArtifact = load_object(&self.model_path)?;
        debug!(model = %model.name, test_r2 = model.test_r2, "Artifacts loaded");
        Ok((preprocessor, model))
    }

    fn run(
        preprocessor: &PreprocessorArtifact,
        model: &ModelArtifact,
        df: &DataFrame,
    ) -> Result<Vec<f64>> {
        let features = preprocessor
            .preprocessor
            .transform(df)
            .map_err(|e| match e {
                PipelineError::SchemaMismatch(msg) => PipelineError::BadInput(msg),
                other => other,
            })?;
        Ok(model.model.predict(&features)?.to_vec())
    }
}
