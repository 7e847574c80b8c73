//! Trainer configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::grid_search::ParamGrid;
use super::models::ModelKind;
use crate::error::{PipelineError, Result};

/// Configuration for model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Minimum test R² the winning model must reach
    pub quality_floor: f64,

    /// Folds used by the grid search
    pub cv_folds: usize,

    /// Seed for fold shuffling and stochastic estimators
    pub seed: u64,

    /// Estimators to try, in selection order
    pub models: Vec<ModelKind>,

    /// Grid overrides keyed by model display name
    pub grids: BTreeMap<String, ParamGrid>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            quality_floor: 0.6,
            cv_folds: 3,
            seed: 42,
            models: ModelKind::all(),
            grids: BTreeMap::new(),
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality_floor(mut self, floor: f64) -> Self {
        self.quality_floor = floor;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_models(mut self, models: Vec<ModelKind>) -> Self {
        self.models = models;
        self
    }

    pub fn with_grid(mut self, kind: ModelKind, grid: ParamGrid) -> Self {
        self.grids.insert(kind.name().to_string(), grid);
        self
    }

    /// Fit every model once with its defaults
    pub fn without_search(mut self) -> Self {
        for kind in &self.models {
            self.grids.insert(kind.name().to_string(), ParamGrid::new());
        }
        self
    }

    /// Grid for `kind`: the override if one is set, else the built-in grid
    pub fn grid_for(&self, kind: ModelKind) -> ParamGrid {
        self.grids
            .get(kind.name())
            .cloned()
            .unwrap_or_else(|| kind.default_grid())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.quality_floor.is_finite() {
            return Err(PipelineError::Config(
                "quality_floor must be a finite number".to_string(),
            ));
        }
        if self.cv_folds < 2 {
            return Err(PipelineError::Config("cv_folds must be at least 2".to_string()));
        }
        if self.models.is_empty() {
            return Err(PipelineError::Config("model roster is empty".to_string()));
        }
        if let Some(name) = self.grids.keys().find(|n| ModelKind::from_name(n).is_none()) {
            return Err(PipelineError::Config(format!("grid for unknown model {}", name)));
        }
        Ok(())
    }
}
