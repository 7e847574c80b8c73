//! Model roster, regression metrics and the estimator trait

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::adaboost::AdaBoostRegressor;
use super::catboost::{CatBoostConfig, CatBoostRegressor};
use super::decision_tree::DecisionTree;
use super::grid_search::{ParamGrid, ParamSet};
use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::knn::KNNRegressor;
use super::linear_models::{LassoRegression, LinearRegression, RidgeRegression};
use super::random_forest::{MaxFeatures, RandomForest};
use super::xgboost::{XGBoostConfig, XGBoostRegressor};

/// Coefficient of determination.
///
/// When the target is constant the score is 1.0 for an exact fit and 0.0
/// otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len();
    if n == 0 || n != y_pred.len() {
        return 0.0;
    }
    let mean = y_true.sum() / n as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Metrics for model evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// R-squared
    pub r2: f64,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute regression metrics
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len().max(1) as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae: f64 = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2: r2_score(y_true, y_pred),
            n_samples: y_true.len(),
        }
    }
}

/// Trait for regression estimators
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

macro_rules! impl_regressor {
    ($($ty:ty),* $(,)?) => {$(
        impl Regressor for $ty {
            fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
                <$ty>::fit(self, x, y).map(|_| ())
            }

            fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
                <$ty>::predict(self, x)
            }
        }
    )*};
}

impl_regressor!(
    LinearRegression,
    LassoRegression,
    RidgeRegression,
    KNNRegressor,
    DecisionTree,
    RandomForest,
    XGBoostRegressor,
    CatBoostRegressor,
    GradientBoostingRegressor,
    AdaBoostRegressor,
);

/// The estimators the trainer tries, in selection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    LinearRegression,
    Lasso,
    Ridge,
    KNeighbors,
    DecisionTree,
    RandomForest,
    XGBoost,
    CatBoost,
    GradientBoosting,
    AdaBoost,
}

impl ModelKind {
    /// Full roster in selection order
    pub fn all() -> Vec<ModelKind> {
        vec![
            ModelKind::LinearRegression,
            ModelKind::Lasso,
            ModelKind::Ridge,
            ModelKind::KNeighbors,
            ModelKind::DecisionTree,
            ModelKind::RandomForest,
            ModelKind::XGBoost,
            ModelKind::CatBoost,
            ModelKind::GradientBoosting,
            ModelKind::AdaBoost,
        ]
    }

    /// Display name used in reports and artifacts
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LinearRegression => "Linear Regression",
            ModelKind::Lasso => "Lasso",
            ModelKind::Ridge => "Ridge",
            ModelKind::KNeighbors => "K-Neighbors Regressor",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::RandomForest => "Random Forest Regressor",
            ModelKind::XGBoost => "XGBRegressor",
            ModelKind::CatBoost => "CatBoost Regressor",
            ModelKind::GradientBoosting => "Gradient Boosting",
            ModelKind::AdaBoost => "AdaBoost Regressor",
        }
    }

    pub fn from_name(name: &str) -> Option<ModelKind> {
        Self::all().into_iter().find(|k| k.name() == name)
    }

    /// Hyperparameters accepted by [`ModelKind::build`]
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            ModelKind::LinearRegression => &[],
            ModelKind::Lasso => &["alpha", "max_iter"],
            ModelKind::Ridge => &["alpha"],
            ModelKind::KNeighbors => &["n_neighbors"],
            ModelKind::DecisionTree => &["max_depth", "min_samples_split", "min_samples_leaf"],
            ModelKind::RandomForest => &["n_estimators", "max_depth", "min_samples_leaf"],
            ModelKind::XGBoost => &[
                "learning_rate",
                "n_estimators",
                "max_depth",
                "reg_lambda",
                "subsample",
            ],
            ModelKind::CatBoost => &["depth", "learning_rate", "iterations", "l2_leaf_reg"],
            ModelKind::GradientBoosting => {
                &["learning_rate", "subsample", "n_estimators", "max_depth"]
            }
            ModelKind::AdaBoost => &["learning_rate", "n_estimators", "max_depth"],
        }
    }

    /// Candidate values searched when the configuration does not override them
    pub fn default_grid(&self) -> ParamGrid {
        let grid: &[(&str, &[f64])] = match self {
            ModelKind::LinearRegression => &[],
            ModelKind::Lasso => &[("alpha", &[0.001, 0.01, 0.1, 1.0])],
            ModelKind::Ridge => &[("alpha", &[0.01, 0.1, 1.0, 10.0])],
            ModelKind::KNeighbors => &[("n_neighbors", &[3.0, 5.0, 7.0, 9.0])],
            ModelKind::DecisionTree => &[("max_depth", &[4.0, 8.0, 12.0])],
            ModelKind::RandomForest => &[("n_estimators", &[8.0, 16.0, 32.0, 64.0, 128.0])],
            ModelKind::XGBoost => &[
                ("learning_rate", &[0.1, 0.05, 0.01]),
                ("n_estimators", &[32.0, 64.0, 128.0]),
            ],
            ModelKind::CatBoost => &[
                ("depth", &[4.0, 6.0, 8.0]),
                ("learning_rate", &[0.01, 0.05, 0.1]),
                ("iterations", &[30.0, 50.0, 100.0]),
            ],
            ModelKind::GradientBoosting => &[
                ("learning_rate", &[0.1, 0.05, 0.01]),
                ("subsample", &[0.6, 0.8, 1.0]),
                ("n_estimators", &[32.0, 64.0, 128.0]),
            ],
            ModelKind::AdaBoost => &[
                ("learning_rate", &[0.1, 0.5, 1.0]),
                ("n_estimators", &[16.0, 32.0, 64.0]),
            ],
        };
        grid.iter()
            .map(|(name, values)| (name.to_string(), values.to_vec()))
            .collect()
    }

    /// Unfitted estimator with `params` applied over the defaults
    pub fn build(&self, params: &ParamSet, seed: u64) -> Result<TrainedModel> {
        let allowed = self.param_names();
        if let Some(unknown) = params.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(PipelineError::Config(format!(
                "unknown hyperparameter {} for {}",
                unknown,
                self.name()
            )));
        }
        let p = Params { params, model: self.name() };

        let model = match self {
            ModelKind::LinearRegression => TrainedModel::LinearRegression(LinearRegression::new()),
            ModelKind::Lasso => TrainedModel::Lasso(
                LassoRegression::new(p.non_negative("alpha", 1.0)?)
                    .with_max_iter(p.count("max_iter", 1000)?),
            ),
            ModelKind::Ridge => TrainedModel::Ridge(RidgeRegression::new(p.non_negative("alpha", 1.0)?)),
            ModelKind::KNeighbors => {
                TrainedModel::KNeighbors(KNNRegressor::with_k(p.count("n_neighbors", 5)?))
            }
            ModelKind::DecisionTree => {
                let mut tree = DecisionTree::new()
                    .with_min_samples_split(p.count("min_samples_split", 2)?)
                    .with_min_samples_leaf(p.count("min_samples_leaf", 1)?)
                    .with_random_state(seed);
                if let Some(depth) = p.optional_count("max_depth")? {
                    tree = tree.with_max_depth(depth);
                }
                TrainedModel::DecisionTree(tree)
            }
            ModelKind::RandomForest => {
                let mut forest = RandomForest::new(p.count("n_estimators", 100)?)
                    .with_min_samples_leaf(p.count("min_samples_leaf", 1)?)
                    .with_max_features(MaxFeatures::All)
                    .with_random_state(seed);
                if let Some(depth) = p.optional_count("max_depth")? {
                    forest = forest.with_max_depth(depth);
                }
                TrainedModel::RandomForest(forest)
            }
            ModelKind::XGBoost => {
                let defaults = XGBoostConfig::default();
                TrainedModel::XGBoost(XGBoostRegressor::new(XGBoostConfig {
                    n_estimators: p.count("n_estimators", defaults.n_estimators)?,
                    learning_rate: p.positive("learning_rate", defaults.learning_rate)?,
                    max_depth: p.count("max_depth", defaults.max_depth)?,
                    reg_lambda: p.non_negative("reg_lambda", defaults.reg_lambda)?,
                    subsample: p.fraction("subsample", defaults.subsample)?,
                    random_state: seed,
                    ..defaults
                }))
            }
            ModelKind::CatBoost => {
                let defaults = CatBoostConfig::default();
                TrainedModel::CatBoost(CatBoostRegressor::new(CatBoostConfig {
                    iterations: p.count("iterations", defaults.iterations)?,
                    learning_rate: p.positive("learning_rate", defaults.learning_rate)?,
                    depth: p.count("depth", defaults.depth)?,
                    l2_leaf_reg: p.non_negative("l2_leaf_reg", defaults.l2_leaf_reg)?,
                    random_state: seed,
                }))
            }
            ModelKind::GradientBoosting => {
                let defaults = GradientBoostingConfig::default();
                TrainedModel::GradientBoosting(GradientBoostingRegressor::new(GradientBoostingConfig {
                    n_estimators: p.count("n_estimators", defaults.n_estimators)?,
                    learning_rate: p.positive("learning_rate", defaults.learning_rate)?,
                    max_depth: p.count("max_depth", defaults.max_depth)?,
                    subsample: p.fraction("subsample", defaults.subsample)?,
                    random_state: seed,
                    ..defaults
                }))
            }
            ModelKind::AdaBoost => TrainedModel::AdaBoost(
                AdaBoostRegressor::new(
                    p.count("n_estimators", 50)?,
                    p.positive("learning_rate", 1.0)?,
                )
                .with_max_depth(p.count("max_depth", 3)?)
                .with_random_state(seed),
            ),
        };
        Ok(model)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed lookups into a [`ParamSet`]
struct Params<'a> {
    params: &'a ParamSet,
    model: &'static str,
}

impl Params<'_> {
    fn invalid(&self, name: &str, value: f64, expected: &str) -> PipelineError {
        PipelineError::Config(format!(
            "{} for {} must be {}, got {}",
            name, self.model, expected, value
        ))
    }

    fn optional_count(&self, name: &str) -> Result<Option<usize>> {
        match self.params.get(name) {
            None => Ok(None),
            Some(&v) if v.is_finite() && v >= 1.0 && v.fract() == 0.0 => Ok(Some(v as usize)),
            Some(&v) => Err(self.invalid(name, v, "a whole number >= 1")),
        }
    }

    fn count(&self, name: &str, default: usize) -> Result<usize> {
        Ok(self.optional_count(name)?.unwrap_or(default))
    }

    fn positive(&self, name: &str, default: f64) -> Result<f64> {
        match self.params.get(name) {
            None => Ok(default),
            Some(&v) if v.is_finite() && v > 0.0 => Ok(v),
            Some(&v) => Err(self.invalid(name, v, "> 0")),
        }
    }

    fn non_negative(&self, name: &str, default: f64) -> Result<f64> {
        match self.params.get(name) {
            None => Ok(default),
            Some(&v) if v.is_finite() && v >= 0.0 => Ok(v),
            Some(&v) => Err(self.invalid(name, v, ">= 0")),
        }
    }

    fn fraction(&self, name: &str, default: f64) -> Result<f64> {
        match self.params.get(name) {
            None => Ok(default),
            Some(&v) if v > 0.0 && v <= 1.0 => Ok(v),
            Some(&v) => Err(self.invalid(name, v, "in (0, 1]")),
        }
    }
}

/// A fitted (or ready to fit) estimator of any roster kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LinearRegression(LinearRegression),
    Lasso(LassoRegression),
    Ridge(RidgeRegression),
    KNeighbors(KNNRegressor),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    XGBoost(XGBoostRegressor),
    CatBoost(CatBoostRegressor),
    GradientBoosting(GradientBoostingRegressor),
    AdaBoost(AdaBoostRegressor),
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::LinearRegression(_) => ModelKind::LinearRegression,
            TrainedModel::Lasso(_) => ModelKind::Lasso,
            TrainedModel::Ridge(_) => ModelKind::Ridge,
            TrainedModel::KNeighbors(_) => ModelKind::KNeighbors,
            TrainedModel::DecisionTree(_) => ModelKind::DecisionTree,
            TrainedModel::RandomForest(_) => ModelKind::RandomForest,
            TrainedModel::XGBoost(_) => ModelKind::XGBoost,
            TrainedModel::CatBoost(_) => ModelKind::CatBoost,
            TrainedModel::GradientBoosting(_) => ModelKind::GradientBoosting,
            TrainedModel::AdaBoost(_) => ModelKind::AdaBoost,
        }
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::Lasso(m) => m,
            TrainedModel::Ridge(m) => m,
            TrainedModel::KNeighbors(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::XGBoost(m) => m,
            TrainedModel::CatBoost(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::AdaBoost(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::Lasso(m) => m,
            TrainedModel::Ridge(m) => m,
            TrainedModel::KNeighbors(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::XGBoost(m) => m,
            TrainedModel::CatBoost(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::AdaBoost(m) => m,
        }
    }
}

impl Regressor for TrainedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }
}
