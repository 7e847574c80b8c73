//! Model trainer: roster search, holdout selection and the quality gate

use std::path::PathBuf;

use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::config::TrainerConfig;
use super::grid_search::{GridSearch, ParamSet};
use super::models::{r2_score, ModelKind, RegressionMetrics, Regressor, TrainedModel};
use crate::artifacts::{save_object, ModelArtifact};
use crate::config::ArtifactPaths;
use crate::error::{PipelineError, Result};
use crate::preprocessing::TransformedSplits;

/// Holdout result of one roster entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelScore {
    pub name: String,
    pub kind: ModelKind,
    pub test_r2: f64,
    /// Mean cross-validated R² of the chosen parameters
    pub cv_score: Option<f64>,
    pub best_params: ParamSet,
    pub metrics: RegressionMetrics,
}

/// Per-model scores in roster order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub scores: Vec<ModelScore>,
}

impl EvaluationReport {
    pub fn get(&self, name: &str) -> Option<&ModelScore> {
        self.scores.iter().find(|s| s.name == name)
    }

    /// Highest test R²; the earlier entry wins ties
    pub fn best(&self) -> Option<&ModelScore> {
        let mut best: Option<&ModelScore> = None;
        for score in &self.scores {
            let better = best.map_or(true, |b| {
                selection_score(score.test_r2) > selection_score(b.test_r2)
            });
            if better {
                best = Some(score);
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelScore> {
        self.scores.iter()
    }
}

/// Result of a successful training run
#[derive(Debug, Clone)]
pub struct TrainerOutcome {
    pub best_model: String,
    pub r2: f64,
    pub report: EvaluationReport,
    /// Winner's predictions on the test split, in row order
    pub test_predictions: Vec<f64>,
    pub model_path: PathBuf,
}

/// Training stage of the offline pipeline
pub struct ModelTrainer {
    config: TrainerConfig,
    paths: ArtifactPaths,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig, paths: ArtifactPaths) -> Self {
        Self { config, paths }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Search every roster entry, score it on the test split and persist the
    /// winner if it clears the quality floor.
    pub fn initiate(&self, splits: &TransformedSplits) -> Result<TrainerOutcome> {
        self.config.validate()?;
        let (x_train, y_train) = split_features_target(&splits.train)?;
        let (x_test, y_test) = split_features_target(&splits.test)?;
        if x_train.ncols() != x_test.ncols() {
            return Err(PipelineError::Training(format!(
                "train has {} features but test has {}",
                x_train.ncols(),
                x_test.ncols()
            )));
        }

        info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = x_train.ncols(),
            models = self.config.models.len(),
            "Model training started"
        );

        let mut report = EvaluationReport::default();
        let mut best: Option<(usize, TrainedModel, Array1<f64>)> = None;

        for kind in &self.config.models {
            let search = GridSearch::new(*kind, self.config.grid_for(*kind))
                .with_cv_folds(self.config.cv_folds)
                .with_seed(self.config.seed);
            let result = search.fit(&x_train, &y_train).map_err(|e| {
                warn!(model = kind.name(), error = %e, "Grid search failed");
                e
            })?;

            let predictions = result.model.predict(&x_test)?;
            let metrics = RegressionMetrics::compute(&y_test, &predictions);
            let test_r2 = r2_score(&y_test, &predictions);

            info!(
                model = kind.name(),
                r2 = test_r2,
                rmse = metrics.rmse,
                mae = metrics.mae,
                cv_score = ?result.best_score,
                "Model evaluated"
            );

            let idx = report.scores.len();
            let improves = match &best {
                Some((best_idx, _, _)) => {
                    selection_score(test_r2) > selection_score(report.scores[*best_idx].test_r2)
                }
                None => true,
            };

            report.scores.push(ModelScore {
                name: kind.name().to_string(),
                kind: *kind,
                test_r2,
                cv_score: result.best_score,
                best_params: result.best_params,
                metrics,
            });

            if improves {
                best = Some((idx, result.model, predictions));
            }
        }

        let (best_idx, model, predictions) = best.ok_or_else(|| {
            PipelineError::Config("model roster is empty".to_string())
        })?;
        let winner = &report.scores[best_idx];
        let model_path = self.paths.model();

        if selection_score(winner.test_r2) < self.config.quality_floor {
            if model_path.exists() {
                std::fs::remove_file(&model_path)?;
            }
            warn!(
                model = %winner.name,
                r2 = winner.test_r2,
                floor = self.config.quality_floor,
                "No model reached the quality floor"
            );
            return Err(PipelineError::NoAcceptableModel {
                best_model: winner.name.clone(),
                best_score: winner.test_r2,
                floor: self.config.quality_floor,
            });
        }

        let artifact = ModelArtifact {
            name: winner.name.clone(),
            params: winner.best_params.clone(),
            test_r2: winner.test_r2,
            trained_at: chrono::Utc::now().to_rfc3339(),
            model,
        };
        save_object(&model_path, &artifact)?;

        info!(
            model = %winner.name,
            r2 = winner.test_r2,
            path = %model_path.display(),
            "Best model saved"
        );

        Ok(TrainerOutcome {
            best_model: winner.name.clone(),
            r2: winner.test_r2,
            test_predictions: predictions.to_vec(),
            report,
            model_path,
        })
    }
}

/// NaN scores never win
fn selection_score(r2: f64) -> f64 {
    if r2.is_nan() {
        f64::NEG_INFINITY
    } else {
        r2
    }
}

/// Split a transformed array into features and the trailing target column
pub fn split_features_target(data: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    let width = data.ncols();
    if width < 2 {
        return Err(PipelineError::Training(format!(
            "expected at least one feature and a target column, got {} columns",
            width
        )));
    }
    if data.nrows() == 0 {
        return Err(PipelineError::Training("split has no rows".to_string()));
    }
    let x = data.slice(s![.., ..width - 1]).to_owned();
    let y = data.column(width - 1).to_owned();
    Ok((x, y))
}
