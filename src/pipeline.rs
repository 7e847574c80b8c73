//! Offline training pipeline: ingestion, transformation, model training

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{Locate, Result};
use crate::ingestion::{DataIngestion, IngestionArtifacts};
use crate::preprocessing::DataTransformation;
use crate::training::{ModelTrainer, TrainerOutcome};

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub ingestion: IngestionArtifacts,
    pub n_features: usize,
    pub feature_names: Vec<String>,
    pub outcome: TrainerOutcome,
    pub elapsed_secs: f64,
}

/// Runs the three offline stages in order
pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<TrainingSummary> {
        let start = Instant::now();
        self.config.schema.validate().located()?;
        self.config.trainer.validate().located()?;

        let ingestion = DataIngestion::new(self.config.ingestion.clone(), self.config.artifacts.clone())
            .initiate()
            .located()?;

        let splits = DataTransformation::new(
            self.config.schema.clone(),
            self.config.preprocessing.clone(),
            self.config.artifacts.clone(),
        )
        .initiate(&ingestion.train_path, &ingestion.test_path)
        .located()?;

        let outcome = match ModelTrainer::new(self.config.trainer.clone(), self.config.artifacts.clone())
            .initiate(&splits)
        {
            Ok(outcome) => outcome,
            Err(e) => {
                discard_preprocessor(&splits.preprocessor_path);
                return Err(e.at_caller());
            }
        };

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            model = %outcome.best_model,
            r2 = outcome.r2,
            elapsed_secs,
            "Training pipeline completed"
        );

        Ok(TrainingSummary {
            ingestion,
            n_features: splits.n_features(),
            feature_names: splits.feature_names,
            outcome,
            elapsed_secs,
        })
    }
}

/// A failed run leaves no preprocessor without a matching model
fn discard_preprocessor(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Could not remove preprocessor artifact");
        }
    }
}
