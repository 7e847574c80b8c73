//! CatBoost-style gradient boosting
//!
//! Key features:
//! - Symmetric (oblivious) decision trees: all nodes at same depth use the same split
//! - Quantized features: at most [`MAX_BORDERS`] candidate borders per feature,
//!   split search runs on per-bucket gradient histograms
//! - Ordered boosting: training predictions are updated with leaf values
//!   estimated only from samples that precede each row in a random permutation

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Upper bound on candidate borders per feature
pub const MAX_BORDERS: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatBoostConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    pub depth: usize,
    /// L2 regularization on leaf values
    pub l2_leaf_reg: f64,
    pub random_state: u64,
}

impl Default for CatBoostConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            learning_rate: 0.1,
            depth: 6,
            l2_leaf_reg: 3.0,
            random_state: 42,
        }
    }
}

/// Symmetric (oblivious) tree: each level uses the same split feature + threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SymmetricTree {
    splits: Vec<(usize, f64)>, // (feature, threshold) per level
    leaf_values: Vec<f64>,     // 2^depth leaf values
}

impl SymmetricTree {
    fn leaf_index(&self, sample: ArrayView1<f64>) -> usize {
        self.splits.iter().fold(0usize, |idx, &(feature, threshold)| {
            idx * 2 + usize::from(sample[feature] > threshold)
        })
    }

    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        self.leaf_values[self.leaf_index(sample)]
    }
}

/// Candidate borders of every feature plus each sample's bin index
#[derive(Debug, Clone)]
struct Quantized {
    borders: Vec<Vec<f64>>,
    /// `bins[f][i]` = number of borders of feature `f` strictly below `x[i, f]`
    bins: Vec<Vec<u8>>,
}

impl Quantized {
    fn new(x: &Array2<f64>) -> Self {
        let borders: Vec<Vec<f64>> = (0..x.ncols())
            .into_par_iter()
            .map(|f| feature_borders(x.column(f)))
            .collect();
        let bins = borders
            .par_iter()
            .enumerate()
            .map(|(f, b)| {
                x.column(f)
                    .iter()
                    .map(|v| b.partition_point(|border| border < v) as u8)
                    .collect()
            })
            .collect();
        Self { borders, bins }
    }
}

fn feature_borders(values: ArrayView1<f64>) -> Vec<f64> {
    let mut unique: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    unique.sort_by(|a, b| a.total_cmp(b));
    unique.dedup();
    if unique.len() < 2 {
        return Vec::new();
    }

    let n_gaps = unique.len() - 1;
    let mut borders: Vec<f64> = if n_gaps <= MAX_BORDERS {
        unique.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    } else {
        (1..=MAX_BORDERS)
            .map(|k| {
                let pos = (k * unique.len() / (MAX_BORDERS + 1)).clamp(1, n_gaps);
                (unique[pos - 1] + unique[pos]) / 2.0
            })
            .collect()
    };
    borders.dedup();
    borders
}

/// Best (feature, border index, gain) for one tree level
fn best_level_split(
    quantized: &Quantized,
    gradients: &[f64],
    buckets: &[Vec<usize>],
    l2_leaf_reg: f64,
) -> Option<(usize, usize, f64)> {
    let candidates: Vec<Option<(usize, usize, f64)>> = (0..quantized.borders.len())
        .into_par_iter()
        .map(|feat| {
            let n_borders = quantized.borders[feat].len();
            if n_borders == 0 {
                return None;
            }
            let bins = &quantized.bins[feat];
            let mut gains = vec![0.0; n_borders];

            for bucket in buckets {
                // Squared loss: hessian is 1 per sample, so h is the count
                let mut hist_g = vec![0.0; n_borders + 1];
                let mut hist_h = vec![0.0; n_borders + 1];
                for &i in bucket {
                    let b = bins[i] as usize;
                    hist_g[b] += gradients[i];
                    hist_h[b] += 1.0;
                }
                let g_total: f64 = hist_g.iter().sum();
                let h_total: f64 = hist_h.iter().sum();
                let parent = g_total * g_total / (h_total + l2_leaf_reg);

                let mut lg = 0.0;
                let mut lh = 0.0;
                for (b, gain) in gains.iter_mut().enumerate() {
                    lg += hist_g[b];
                    lh += hist_h[b];
                    let rg = g_total - lg;
                    let rh = h_total - lh;
                    *gain += lg * lg / (lh + l2_leaf_reg) + rg * rg / (rh + l2_leaf_reg) - parent;
                }
            }

            gains
                .iter()
                .enumerate()
                .fold(None, |acc: Option<(usize, usize, f64)>, (b, &g)| match acc {
                    Some(a) if a.2 >= g => Some(a),
                    _ => Some((feat, b, g)),
                })
        })
        .collect();

    candidates
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<(usize, usize, f64)>, c| match acc {
            Some(a) if a.2 >= c.2 => Some(a),
            _ => Some(c),
        })
        .filter(|c| c.2 > 1e-12)
}

/// Grow one oblivious tree and return it with each row's leaf index
fn build_symmetric_tree(
    quantized: &Quantized,
    gradients: &[f64],
    depth: usize,
    l2_leaf_reg: f64,
) -> (SymmetricTree, Vec<usize>) {
    let n = gradients.len();
    let mut splits = Vec::with_capacity(depth);
    let mut leaf_of = vec![0usize; n];
    let mut buckets: Vec<Vec<usize>> = vec![(0..n).collect()];

    for _ in 0..depth {
        let Some((feat, border, _)) = best_level_split(quantized, gradients, &buckets, l2_leaf_reg)
        else {
            break;
        };
        splits.push((feat, quantized.borders[feat][border]));

        let bins = &quantized.bins[feat];
        let mut new_buckets = Vec::with_capacity(buckets.len() * 2);
        for bucket in &buckets {
            let (left, right): (Vec<usize>, Vec<usize>) =
                bucket.iter().partition(|&&i| bins[i] as usize <= border);
            new_buckets.push(left);
            new_buckets.push(right);
        }
        buckets = new_buckets;
    }

    let leaf_values: Vec<f64> = buckets
        .iter()
        .enumerate()
        .map(|(leaf, bucket)| {
            let g: f64 = bucket.iter().map(|&i| gradients[i]).sum();
            for &i in bucket {
                leaf_of[i] = leaf;
            }
            -g / (bucket.len() as f64 + l2_leaf_reg)
        })
        .collect();

    (SymmetricTree { splits, leaf_values }, leaf_of)
}

/// Per-row leaf values estimated from the rows that precede it in `perm`
fn ordered_leaf_values(
    gradients: &[f64],
    leaf_of: &[usize],
    n_leaves: usize,
    perm: &[usize],
    l2_leaf_reg: f64,
) -> Vec<f64> {
    let mut g_prefix = vec![0.0; n_leaves];
    let mut h_prefix = vec![0.0; n_leaves];
    let mut values = vec![0.0; gradients.len()];
    for &i in perm {
        let leaf = leaf_of[i];
        values[i] = -g_prefix[leaf] / (h_prefix[leaf] + l2_leaf_reg);
        g_prefix[leaf] += gradients[i];
        h_prefix[leaf] += 1.0;
    }
    values
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatBoostRegressor {
    pub config: CatBoostConfig,
    trees: Vec<SymmetricTree>,
    base_prediction: f64,
    n_features: usize,
}

impl CatBoostRegressor {
    pub fn new(config: CatBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_prediction: 0.0,
            n_features: 0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(PipelineError::Training("cannot boost on zero rows".to_string()));
        }
        if n != y.len() {
            return Err(PipelineError::Training(format!(
                "x has {} rows but y has {} values",
                n,
                y.len()
            )));
        }

        self.n_features = x.ncols();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut perm: Vec<usize> = (0..n).collect();
        perm.shuffle(&mut rng);

        let quantized = Quantized::new(x);
        self.base_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = vec![self.base_prediction; n];
        self.trees.clear();

        for _ in 0..self.config.iterations {
            let gradients: Vec<f64> = predictions.iter().zip(y.iter()).map(|(&p, &yi)| p - yi).collect();

            let (tree, leaf_of) =
                build_symmetric_tree(&quantized, &gradients, self.config.depth, self.config.l2_leaf_reg);
            let ordered = ordered_leaf_values(
                &gradients,
                &leaf_of,
                tree.leaf_values.len(),
                &perm,
                self.config.l2_leaf_reg,
            );

            for (pred, step) in predictions.iter_mut().zip(ordered) {
                *pred += self.config.learning_rate * step;
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_features == 0 {
            return Err(PipelineError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(PipelineError::Training(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        let lr = self.config.learning_rate;
        Ok(x
            .outer_iter()
            .map(|row| {
                self.base_prediction + self.trees.iter().map(|t| lr * t.predict(row)).sum::<f64>()
            })
            .collect())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((80, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 4) as f64 });
        let y: Array1<f64> = x.rows().into_iter().map(|r| 0.5 * r[0] + 3.0 * r[1]).collect();
        (x, y)
    }

    #[test]
    fn test_borders_are_capped() {
        let values = Array1::from_iter((0..1000).map(|i| i as f64));
        let borders = feature_borders(values.view());
        assert!(borders.len() <= MAX_BORDERS);
        assert!(borders.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_borders_for_few_values() {
        let borders = feature_borders(array![1.0, 3.0, 1.0, 5.0].view());
        assert_eq!(borders, vec![2.0, 4.0]);
        assert!(feature_borders(array![2.0, 2.0].view()).is_empty());
    }

    #[test]
    fn test_catboost_regressor_fits() {
        let (x, y) = regression_data();
        let mut model = CatBoostRegressor::new(CatBoostConfig {
            iterations: 100,
            depth: 4,
            learning_rate: 0.3,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let ss_res = (&preds - &y).mapv(|v| v * v).sum();
        let y_mean = y.mean().unwrap();
        let ss_tot = y.mapv(|v| (v - y_mean).powi(2)).sum();
        assert!(1.0 - ss_res / ss_tot > 0.9);
        assert_eq!(model.n_trees(), 100);
    }

    #[test]
    fn test_same_seed_same_model() {
        let (x, y) = regression_data();
        let config = CatBoostConfig {
            iterations: 10,
            ..Default::default()
        };
        let mut a = CatBoostRegressor::new(config.clone());
        let mut b = CatBoostRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = CatBoostRegressor::new(CatBoostConfig::default());
        assert!(matches!(
            model.predict(&Array2::zeros((1, 2))),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}
