//! Linear model implementations

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Relative pivot size below which the normal matrix is treated as singular
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Falls back to a jittered solve if the matrix is near-singular.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }
    if n == 0 {
        return Some(Array1::zeros(0));
    }

    let max_diag = a.diag().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    match cholesky_factor(a, PIVOT_TOLERANCE * max_diag) {
        Some(l) => Some(cholesky_substitute(&l, b)),
        None => {
            // Not positive definite; add a small ridge and retry once
            let mut a_reg = a.clone();
            let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64;
            let ridge = if ridge > 0.0 { ridge } else { 1e-8 };
            for k in 0..n {
                a_reg[[k, k]] += ridge;
            }
            cholesky_factor(&a_reg, 0.0).map(|l| cholesky_substitute(&l, b))
        }
    }
}

/// Lower-triangular factor `L` with `A = L * L^T`; `None` when a pivot is
/// not above `min_pivot`.
fn cholesky_factor(a: &Array2<f64>, min_pivot: f64) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= min_pivot {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

fn cholesky_substitute(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Matrix inversion using Gauss-Jordan elimination (fallback)
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // Augmented matrix [M | I]
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }

        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Some(inv)
}

/// Solve `(X^T X + alpha*I) w = X^T y`, Cholesky first, then Gauss-Jordan
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let mut xtx = x.t().dot(x);
    if alpha > 0.0 {
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += alpha;
        }
    }
    let xty = x.t().dot(y);

    if let Some(result) = cholesky_solve(&xtx, &xty) {
        return Ok(result);
    }
    matrix_inverse(&xtx)
        .map(|inv| inv.dot(&xty))
        .ok_or_else(|| PipelineError::Training("normal matrix is singular".to_string()))
}

/// Centered copies of `x` and `y` plus the means that were removed
struct Centered {
    x: Array2<f64>,
    y: Array1<f64>,
    x_mean: Array1<f64>,
    y_mean: f64,
}

fn center(x: &Array2<f64>, y: &Array1<f64>, fit_intercept: bool) -> Result<Centered> {
    if x.nrows() != y.len() {
        return Err(PipelineError::Training(format!(
            "x has {} rows but y has {} values",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(PipelineError::Training("cannot fit on zero rows".to_string()));
    }

    if !fit_intercept {
        return Ok(Centered {
            x: x.clone(),
            y: y.clone(),
            x_mean: Array1::zeros(x.ncols()),
            y_mean: 0.0,
        });
    }

    let x_mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| PipelineError::Training("cannot fit on zero rows".to_string()))?;
    let y_mean = y.mean().unwrap_or(0.0);
    Ok(Centered {
        x: x - &x_mean.clone().insert_axis(Axis(0)),
        y: y - y_mean,
        x_mean,
        y_mean,
    })
}

fn linear_predict(
    coefficients: Option<&Array1<f64>>,
    intercept: f64,
    x: &Array2<f64>,
) -> Result<Array1<f64>> {
    let coefficients = coefficients.ok_or(PipelineError::ModelNotFitted)?;
    if x.ncols() != coefficients.len() {
        return Err(PipelineError::Training(format!(
            "expected {} features, got {}",
            coefficients.len(),
            x.ncols()
        )));
    }
    Ok(x.dot(coefficients) + intercept)
}

/// Ordinary least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
        }
    }

    /// Enable/disable fitting intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Fit the model to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let data = center(x, y, self.fit_intercept)?;
        let coefficients = solve_normal_equations(&data.x, &data.y, 0.0)?;

        self.intercept = data.y_mean - coefficients.dot(&data.x_mean);
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x)
    }
}

/// Ridge Regression (L2-regularized linear regression)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
    pub fit_intercept: bool,
    /// L2 regularization strength
    pub alpha: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            alpha,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let data = center(x, y, self.fit_intercept)?;
        let coefficients = solve_normal_equations(&data.x, &data.y, self.alpha)?;

        self.intercept = data.y_mean - coefficients.dot(&data.x_mean);
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x)
    }
}

/// Lasso Regression (L1-regularized via coordinate descent)
///
/// Minimizes `(1 / 2n) * ||y - Xw||^2 + alpha * ||w||_1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
    pub fit_intercept: bool,
    /// L1 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    /// Iterations used by the last fit
    pub n_iter: usize,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            alpha,
            max_iter: 1000,
            tol: 1e-6,
            n_iter: 0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Soft-threshold operator for L1 proximal step
    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let data = center(x, y, self.fit_intercept)?;
        let n_samples = data.x.nrows();
        let n_features = data.x.ncols();

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| data.x.column(j).mapv(|v| v * v).sum())
            .collect();

        let mut w = Array1::zeros(n_features);
        let lambda = self.alpha * n_samples as f64;
        let mut r = data.y.clone();
        self.n_iter = 0;

        for _ in 0..self.max_iter {
            self.n_iter += 1;
            let mut max_change = 0.0_f64;

            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    w[j] = 0.0;
                    continue;
                }
                // rho = x_j^T r + ||x_j||^2 * w_j
                let rho = data.x.column(j).dot(&r) + col_norms[j] * w[j];
                let old_wj = w[j];
                w[j] = Self::soft_threshold(rho, lambda) / col_norms[j];

                let delta = old_wj - w[j];
                if delta != 0.0 {
                    r.scaled_add(delta, &data.x.column(j));
                    max_change = max_change.max(delta.abs());
                }
            }

            if max_change < self.tol {
                break;
            }
        }

        self.intercept = data.y_mean - w.dot(&data.x_mean);
        self.coefficients = Some(w);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x)
    }

    /// Number of non-zero coefficients
    pub fn n_nonzero(&self) -> usize {
        self.coefficients
            .as_ref()
            .map(|w| w.iter().filter(|v| **v != 0.0).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn line_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![[1.0, 0.5], [2.0, 1.0], [3.0, 0.0], [4.0, 2.0], [5.0, 1.5]];
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        (x, y)
    }

    #[test]
    fn test_linear_regression_exact_fit() {
        let (x, y) = line_data();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-8);
        assert!(coef[1].abs() < 1e-8);
        assert!((model.intercept - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_linear_regression_collinear_columns() {
        // Complementary indicators sum to a constant, so the centered
        // normal matrix is singular
        let x = array![
            [1.0, 1.0, 0.0],
            [2.0, 0.0, 1.0],
            [3.0, 1.0, 0.0],
            [4.0, 0.0, 1.0],
            [5.0, 1.0, 0.0]
        ];
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_ridge_shrinks() {
        let (x, y) = line_data();
        let mut ols = LinearRegression::new();
        ols.fit(&x, &y).unwrap();
        let mut ridge = RidgeRegression::new(10.0);
        ridge.fit(&x, &y).unwrap();

        let ols_norm = ols.coefficients.as_ref().unwrap().mapv(|v| v * v).sum();
        let ridge_norm = ridge.coefficients.as_ref().unwrap().mapv(|v| v * v).sum();
        assert!(ridge_norm < ols_norm);
    }

    #[test]
    fn test_lasso_zeroes_irrelevant_feature() {
        let (x, y) = line_data();
        let mut lasso = LassoRegression::new(0.1);
        lasso.fit(&x, &y).unwrap();

        let coef = lasso.coefficients.as_ref().unwrap();
        assert!(coef[0] > 1.5);
        assert_eq!(coef[1], 0.0);
        assert_eq!(lasso.n_nonzero(), 1);
    }

    #[test]
    fn test_predict_before_fit() {
        let (x, _) = line_data();
        assert!(matches!(
            LinearRegression::new().predict(&x),
            Err(PipelineError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let (x, _) = line_data();
        let y = array![1.0, 2.0];
        assert!(LinearRegression::new().fit(&x, &y).is_err());
    }
}
