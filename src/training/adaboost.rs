//! AdaBoost.R2 regressor
//!
//! Each round fits a shallow regression tree on a bootstrap drawn with the
//! current sample weights, scores it with the linear loss, and reweights the
//! training rows. Predictions are the weighted median of the rounds.

use crate::error::{PipelineError, Result};
use super::decision_tree::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// AdaBoost regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Depth of each base tree
    pub max_depth: usize,
    pub random_state: u64,
    estimators: Vec<DecisionTree>,
    estimator_weights: Vec<f64>,
    n_features: usize,
}

impl Default for AdaBoostRegressor {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth: 3,
            random_state: 42,
            estimators: Vec::new(),
            estimator_weights: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n = x.nrows();
        if n != y.len() {
            return Err(PipelineError::Training(format!(
                "x has {} rows but y has {} values",
                n,
                y.len()
            )));
        }
        if n == 0 || self.n_estimators == 0 {
            return Err(PipelineError::Training(
                "AdaBoost needs rows and at least one estimator".to_string(),
            ));
        }

        self.n_features = x.ncols();
        self.estimators.clear();
        self.estimator_weights.clear();

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut weights = Array1::from_elem(n, 1.0 / n as f64);

        for round in 0..self.n_estimators {
            let dist = WeightedIndex::new(weights.iter())
                .map_err(|e| PipelineError::Training(format!("invalid sample weights: {}", e)))?;
            let sample: Vec<usize> = (0..n).map(|_| dist.sample(&mut rng)).collect();

            let mut tree = DecisionTree::new()
                .with_max_depth(self.max_depth)
                .with_random_state(self.random_state.wrapping_add(round as u64));
            tree.fit(&x.select(Axis(0), &sample), &y.select(Axis(0), &sample))?;

            let errors = (&tree.predict(x)? - y).mapv(f64::abs);
            let max_error = errors.fold(0.0_f64, |m, &e| m.max(e));

            if max_error <= 0.0 {
                // Perfect fit; this round decides every prediction
                self.estimators.push(tree);
                self.estimator_weights.push(1.0);
                break;
            }

            // Linear loss
            let losses = errors / max_error;
            let avg_loss = (&weights * &losses).sum();

            if avg_loss >= 0.5 {
                if self.estimators.is_empty() {
                    self.estimators.push(tree);
                    self.estimator_weights.push(1.0);
                }
                break;
            }

            let beta = (avg_loss / (1.0 - avg_loss)).max(1e-12);
            let estimator_weight = self.learning_rate * (1.0 / beta).ln();

            weights.zip_mut_with(&losses, |w, &l| {
                *w *= beta.powf((1.0 - l) * self.learning_rate);
            });
            let total = weights.sum();
            if total <= 0.0 || !total.is_finite() {
                self.estimators.push(tree);
                self.estimator_weights.push(estimator_weight);
                break;
            }
            weights /= total;

            self.estimators.push(tree);
            self.estimator_weights.push(estimator_weight);
        }

        Ok(self)
    }

    /// Weighted median of the per-round predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.estimators.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }

        let per_round: Vec<Array1<f64>> = self
            .estimators
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;
        let total_weight: f64 = self.estimator_weights.iter().sum();

        let mut out = Array1::zeros(x.nrows());
        let mut order: Vec<usize> = (0..per_round.len()).collect();
        for (i, slot) in out.iter_mut().enumerate() {
            order.sort_by(|&a, &b| per_round[a][i].total_cmp(&per_round[b][i]));
            let mut cumulative = 0.0;
            let mut median = per_round[order[order.len() - 1]][i];
            for &r in &order {
                cumulative += self.estimator_weights[r];
                if cumulative >= 0.5 * total_weight {
                    median = per_round[r][i];
                    break;
                }
            }
            *slot = median;
        }
        Ok(out)
    }

    pub fn n_rounds(&self) -> usize {
        self.estimators.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_adaboost_fits_smooth_target() {
        let x = Array2::from_shape_fn((40, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| (v / 4.0).sin() * 10.0);

        let mut model = AdaBoostRegressor::new(30, 0.5);
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        let mean = y.mean().unwrap();
        let r2 = 1.0 - (&pred - &y).mapv(|v| v * v).sum() / y.mapv(|v| (v - mean).powi(2)).sum();
        assert!(r2 > 0.8, "r2 {}", r2);
        assert!(model.n_rounds() >= 1);
    }

    #[test]
    fn test_perfect_first_round_stops() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 1.0, 1.0, 1.0];

        let mut model = AdaBoostRegressor::new(10, 1.0);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_rounds(), 1);
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = AdaBoostRegressor::default();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}
