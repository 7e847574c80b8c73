//! Feature scaling implementations

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of scaler to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// No scaling
    None,
}

/// Parameters for a fitted scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

/// Column-wise feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    /// Subtract the center before scaling; off keeps sparse indicators sparse
    with_mean: bool,
    params: BTreeMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            with_mean: true,
            params: BTreeMap::new(),
            is_fitted: false,
        }
    }

    pub fn with_mean(mut self, with_mean: bool) -> Self {
        self.with_mean = with_mean;
        self
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| PipelineError::SchemaMismatch(format!("missing column {}", col_name)))?;
            let params = self.compute_params(col_name, column.as_materialized_series())?;
            self.params.insert(col_name.to_string(), params);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Scale every fitted column present in `df`
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .filter_map(|(col_name, params)| {
                df.column(col_name)
                    .ok()
                    .map(|column| Self::scale_series(column.as_materialized_series(), params))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fitted parameters for `column`
    pub fn params(&self, column: &str) -> Option<&ScalerParams> {
        self.params.get(column)
    }

    fn compute_params(&self, name: &str, series: &Series) -> Result<ScalerParams> {
        let ca = series
            .f64()
            .map_err(|_| PipelineError::SchemaMismatch(format!("column {} is not numeric", name)))?;

        let params = match self.scaler_type {
            ScalerType::Standard => {
                let mean = ca.mean().unwrap_or(0.0);
                // Population standard deviation
                let std = ca.std(0).unwrap_or(0.0);
                ScalerParams {
                    center: if self.with_mean { mean } else { 0.0 },
                    scale: non_zero_scale(std),
                }
            }
            ScalerType::MinMax => {
                let min = ca.min().unwrap_or(0.0);
                let max = ca.max().unwrap_or(1.0);
                ScalerParams {
                    center: min,
                    scale: non_zero_scale(max - min),
                }
            }
            ScalerType::None => ScalerParams {
                center: 0.0,
                scale: 1.0,
            },
        };
        Ok(params)
    }

    fn scale_series(series: &Series, params: &ScalerParams) -> Result<Series> {
        let ca = series.f64().map_err(|_| {
            PipelineError::SchemaMismatch(format!("column {} is not numeric", series.name()))
        })?;

        let scaled: Float64Chunked = ca
            .into_iter()
            .map(|opt| opt.map(|v| (v - params.center) / params.scale))
            .collect();

        Ok(scaled.with_name(series.name().clone()).into_series())
    }
}

/// Constant columns keep their values instead of dividing by zero
fn non_zero_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 10.0 * f64::EPSILON {
        scale
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name).unwrap().f64().unwrap().into_no_null_iter().collect()
    }

    #[test]
    fn test_standard_scaler_uses_population_std() {
        let df = df!("a" => &[1.0, 3.0]).unwrap();
        let mut scaler = Scaler::new(ScalerType::Standard);
        let result = scaler.fit_transform(&df, &["a"]).unwrap();

        assert_eq!(scaler.params("a"), Some(&ScalerParams { center: 2.0, scale: 1.0 }));
        assert_eq!(values(&result, "a"), vec![-1.0, 1.0]);
    }

    #[test]
    fn test_without_mean_keeps_zeros() {
        let df = df!("flag" => &[0.0, 0.0, 1.0, 1.0]).unwrap();
        let mut scaler = Scaler::new(ScalerType::Standard).with_mean(false);
        let result = scaler.fit_transform(&df, &["flag"]).unwrap();

        assert_eq!(values(&result, "flag"), vec![0.0, 0.0, 2.0, 2.0]);
    }

    #[test]
    fn test_constant_column() {
        let df = df!("c" => &[4.0, 4.0, 4.0]).unwrap();
        let mut scaler = Scaler::new(ScalerType::Standard);
        let result = scaler.fit_transform(&df, &["c"]).unwrap();
        assert_eq!(values(&result, "c"), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_minmax_scaler() {
        let df = df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let mut scaler = Scaler::new(ScalerType::MinMax);
        let result = scaler.fit_transform(&df, &["a"]).unwrap();

        let scaled = values(&result, "a");
        assert!((scaled[0] - 0.0).abs() < 1e-12);
        assert!((scaled[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_transform_before_fit() {
        let df = df!("a" => &[1.0]).unwrap();
        let scaler = Scaler::new(ScalerType::Standard);
        assert!(matches!(scaler.transform(&df), Err(PipelineError::ModelNotFitted)));
    }
}
