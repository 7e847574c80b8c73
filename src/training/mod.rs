//! Model training module
//!
//! Provides the regression roster and model selection:
//! - Linear models (OLS, Ridge, Lasso)
//! - K-Nearest Neighbors
//! - Decision trees and Random Forests
//! - Gradient boosting, XGBoost, CatBoost
//! - AdaBoost
//! - Grid search with k-fold cross-validation
//! - The trainer that applies the quality floor

mod config;
mod models;
mod trainer;
pub mod cross_validation;
pub mod grid_search;
pub mod linear_models;
pub mod decision_tree;
pub mod random_forest;
pub mod gradient_boosting;
pub mod knn;
pub mod adaboost;
pub mod xgboost;
pub mod catboost;

pub use config::TrainerConfig;
pub use models::{r2_score, ModelKind, RegressionMetrics, Regressor, TrainedModel};
pub use trainer::{split_features_target, EvaluationReport, ModelScore, ModelTrainer, TrainerOutcome};
pub use cross_validation::{CVSplit, KFold};
pub use grid_search::{expand_grid, GridSearch, GridSearchResult, ParamGrid, ParamSet};
pub use linear_models::{LassoRegression, LinearRegression, RidgeRegression};
pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
pub use adaboost::AdaBoostRegressor;
pub use xgboost::{XGBoostConfig, XGBoostRegressor};
pub use catboost::{CatBoostConfig, CatBoostRegressor};
