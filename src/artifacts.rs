//! Persisted artifacts shared by the offline pipeline and the predict path

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

use crate::config::FeatureSchema;
use crate::error::{PipelineError, Result};
use crate::preprocessing::DataPreprocessor;
use crate::training::{ParamSet, TrainedModel};

/// Fitted preprocessor together with the schema it was fit on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorArtifact {
    pub schema: FeatureSchema,
    pub preprocessor: DataPreprocessor,
}

/// The winning estimator of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub params: ParamSet,
    /// R² on the held-out test split
    pub test_r2: f64,
    /// RFC 3339 timestamp
    pub trained_at: String,
    pub model: TrainedModel,
}

/// Serialize `value` to `path`, creating parent directories and replacing
/// any previous file.
pub fn save_object<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, value)?;
    debug!(path = %path.display(), "Artifact saved");
    Ok(())
}

/// Load an object written by [`save_object`].
pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(PipelineError::ArtifactNotFound {
            path: path.to_path_buf(),
        });
    }
    let reader = BufReader::new(File::open(path)?);
    let value = bincode::deserialize_from(reader).map_err(|e| {
        PipelineError::Serialization(format!("{}: {}", path.display(), e))
    })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        values: BTreeMap<String, f64>,
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sample.bin");
        let mut values = BTreeMap::new();
        values.insert("alpha".to_string(), 0.5);
        let sample = Sample { name: "x".to_string(), values };

        save_object(&path, &sample).unwrap();
        let loaded: Sample = load_object(&path).unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let err = load_object::<Sample>(&path).unwrap_err();
        match err {
            PipelineError::ArtifactNotFound { path: p } => assert_eq!(p, path),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"\x01").unwrap();
        assert!(matches!(
            load_object::<Sample>(&path),
            Err(PipelineError::Serialization(_))
        ));
    }
}
