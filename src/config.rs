//! Pipeline configuration
//!
//! Every stage reads its settings from [`PipelineConfig`]. The defaults
//! describe the student performance dataset; a JSON file can override any
//! subset of fields and a few environment variables override paths.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::preprocessing::PreprocessingConfig;
use crate::training::TrainerConfig;

/// Fixed column lists shared by ingestion, transformation and prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSchema {
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub target_column: String,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            numeric_columns: vec!["writing_score".to_string(), "reading_score".to_string()],
            categorical_columns: vec![
                "gender".to_string(),
                "race_ethnicity".to_string(),
                "parental_level_of_education".to_string(),
                "lunch".to_string(),
                "test_preparation_course".to_string(),
            ],
            target_column: "math_score".to_string(),
        }
    }
}

impl FeatureSchema {
    pub fn new(
        numeric: &[&str],
        categorical: &[&str],
        target: impl Into<String>,
    ) -> Self {
        Self {
            numeric_columns: numeric.iter().map(|s| s.to_string()).collect(),
            categorical_columns: categorical.iter().map(|s| s.to_string()).collect(),
            target_column: target.into(),
        }
    }

    /// Input feature names, numeric first, in schema order
    pub fn feature_columns(&self) -> Vec<&str> {
        self.numeric_columns
            .iter()
            .chain(self.categorical_columns.iter())
            .map(|s| s.as_str())
            .collect()
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == name)
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical_columns.iter().any(|c| c == name)
    }

    /// Reject empty or overlapping column lists
    pub fn validate(&self) -> Result<()> {
        if self.numeric_columns.is_empty() && self.categorical_columns.is_empty() {
            return Err(PipelineError::Config("schema has no feature columns".to_string()));
        }
        let features = self.feature_columns();
        for (i, name) in features.iter().enumerate() {
            if features[i + 1..].contains(name) {
                return Err(PipelineError::Config(format!("column {} listed twice", name)));
            }
            if *name == self.target_column {
                return Err(PipelineError::Config(format!(
                    "target column {} is also listed as a feature",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Raw data source and split settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub source_path: PathBuf,
    /// Fraction of rows held out for testing
    pub test_size: f64,
    pub seed: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/stud.csv"),
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Locations of everything the offline phase writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new("artifacts")
    }
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn raw_data(&self) -> PathBuf {
        self.dir.join("data.csv")
    }

    pub fn train_data(&self) -> PathBuf {
        self.dir.join("train.csv")
    }

    pub fn test_data(&self) -> PathBuf {
        self.dir.join("test.csv")
    }

    pub fn preprocessor(&self) -> PathBuf {
        self.dir.join("preprocessor.bin")
    }

    pub fn model(&self) -> PathBuf {
        self.dir.join("model.bin")
    }
}

/// Top-level configuration for the offline pipeline and the predict path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ingestion: IngestionConfig,
    pub schema: FeatureSchema,
    pub preprocessing: PreprocessingConfig,
    pub trainer: TrainerConfig,
    pub artifacts: ArtifactPaths,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        config.schema.validate()?;
        Ok(config)
    }

    /// Apply `DATA_PATH` and `ARTIFACTS_DIR` overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("DATA_PATH") {
            self.ingestion.source_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("ARTIFACTS_DIR") {
            self.artifacts = ArtifactPaths::new(dir);
        }
        self
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.ingestion.source_path = path.into();
        self
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts = ArtifactPaths::new(dir);
        self
    }

    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = trainer;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.ingestion.test_size = test_size;
        self
    }

    /// Use one seed for the split and for model training
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.ingestion.seed = seed;
        self.trainer.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.target_column, "math_score");
        assert_eq!(schema.feature_columns().len(), 7);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_schema_rejects_target_as_feature() {
        let schema = FeatureSchema::new(&["a", "target"], &[], "target");
        assert!(matches!(schema.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let schema = FeatureSchema::new(&["a"], &["a"], "y");
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_artifact_paths() {
        let paths = ArtifactPaths::new("/tmp/run");
        assert_eq!(paths.train_data(), PathBuf::from("/tmp/run/train.csv"));
        assert_eq!(paths.model(), PathBuf::from("/tmp/run/model.bin"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "ingestion": { "source_path": "x.csv", "test_size": 0.3, "seed": 7 } }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.ingestion.test_size, 0.3);
        assert_eq!(config.schema, FeatureSchema::default());
        assert_eq!(config.artifacts, ArtifactPaths::default());
    }

    #[test]
    fn test_nested_sections_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(
            &path,
            r#"{ "ingestion": { "source_path": "x.csv" }, "schema": { "target_column": "y" }, "artifacts": {} }"#,
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.ingestion.source_path, PathBuf::from("x.csv"));
        assert_eq!(config.ingestion.test_size, 0.2);
        assert_eq!(config.ingestion.seed, 42);
        assert_eq!(config.schema.target_column, "y");
        assert_eq!(config.schema.numeric_columns, FeatureSchema::default().numeric_columns);
        assert_eq!(config.artifacts, ArtifactPaths::default());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::new()
            .with_source("data.csv")
            .with_artifacts_dir("out")
            .with_test_size(0.25)
            .with_seed(7);
        assert_eq!(config.ingestion.seed, 7);
        assert_eq!(config.trainer.seed, 7);
        assert_eq!(config.artifacts.dir, PathBuf::from("out"));
    }
}
