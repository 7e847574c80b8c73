//! Exhaustive hyperparameter search with k-fold cross-validation

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use tracing::debug;

use super::cross_validation::KFold;
use super::models::{r2_score, ModelKind, Regressor, TrainedModel};
use crate::error::{PipelineError, Result};

/// Candidate values per hyperparameter
pub type ParamGrid = BTreeMap<String, Vec<f64>>;

/// One assignment of hyperparameter values
pub type ParamSet = BTreeMap<String, f64>;

/// Cartesian product of the grid, in key order then value order.
///
/// An empty grid yields a single empty assignment.
pub fn expand_grid(grid: &ParamGrid) -> Vec<ParamSet> {
    let mut candidates = vec![ParamSet::new()];
    for (name, values) in grid {
        candidates = candidates
            .into_iter()
            .flat_map(|base| {
                values.iter().map(move |&v| {
                    let mut next = base.clone();
                    next.insert(name.clone(), v);
                    next
                })
            })
            .collect();
    }
    candidates
}

/// Outcome of a search
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    /// Mean cross-validated R², `None` when no search ran
    pub best_score: Option<f64>,
    /// Every evaluated candidate with its mean score
    pub cv_results: Vec<(ParamSet, f64)>,
    /// Winner refitted on the full training data
    pub model: TrainedModel,
}

/// Grid search over one model kind
#[derive(Debug, Clone)]
pub struct GridSearch {
    kind: ModelKind,
    grid: ParamGrid,
    cv_folds: usize,
    seed: u64,
}

impl GridSearch {
    pub fn new(kind: ModelKind, grid: ParamGrid) -> Self {
        Self {
            kind,
            grid,
            cv_folds: 3,
            seed: 42,
        }
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<GridSearchResult> {
        if let Some((name, _)) = self.grid.iter().find(|(_, values)| values.is_empty()) {
            return Err(PipelineError::Config(format!(
                "no candidate values for {} of {}",
                name,
                self.kind.name()
            )));
        }

        if self.grid.is_empty() {
            let best_params = ParamSet::new();
            let mut model = self.kind.build(&best_params, self.seed)?;
            model.fit(x, y)?;
            return Ok(GridSearchResult {
                best_params,
                best_score: None,
                cv_results: Vec::new(),
                model,
            });
        }

        let candidates = expand_grid(&self.grid);
        // Reject bad names and values before spending time on folds
        for params in &candidates {
            self.kind.build(params, self.seed)?;
        }

        let splits = KFold::new(self.cv_folds)
            .with_random_state(self.seed)
            .split(x.nrows())?;

        let scores: Vec<f64> = candidates
            .par_iter()
            .map(|params| -> Result<f64> {
                let mut total = 0.0;
                for split in &splits {
                    let mut model = self.kind.build(params, self.seed)?;
                    model.fit(
                        &x.select(Axis(0), &split.train_indices),
                        &y.select(Axis(0), &split.train_indices),
                    )?;
                    let pred = model.predict(&x.select(Axis(0), &split.test_indices))?;
                    total += r2_score(&y.select(Axis(0), &split.test_indices), &pred);
                }
                let mean = total / splits.len() as f64;
                Ok(if mean.is_nan() { f64::NEG_INFINITY } else { mean })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut best_idx = 0;
        for (idx, &score) in scores.iter().enumerate() {
            if score > scores[best_idx] {
                best_idx = idx;
            }
        }

        let best_params = candidates[best_idx].clone();
        debug!(
            model = self.kind.name(),
            candidates = candidates.len(),
            best_score = scores[best_idx],
            "Grid search finished"
        );

        let mut model = self.kind.build(&best_params, self.seed)?;
        model.fit(x, y)?;

        Ok(GridSearchResult {
            best_score: Some(scores[best_idx]),
            best_params,
            cv_results: candidates.into_iter().zip(scores).collect(),
            model,
        })
    }
}
