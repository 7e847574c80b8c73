//! Missing value imputation strategies

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with mean (numeric only)
    Mean,
    /// Replace with median (numeric only)
    Median,
    /// Replace with the most frequent value; ties go to the smallest value
    MostFrequent,
    /// Replace with a constant value
    Constant(f64),
    /// Replace with a constant string (categorical)
    ConstantString(String),
}

/// Learned fill value for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeValue {
    Numeric(f64),
    Text(String),
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: BTreeMap<String, ImputeValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Learn one fill value per column
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| PipelineError::SchemaMismatch(format!("missing column {}", col_name)))?;

            let fill_value = self.compute_fill_value(col_name, column.as_materialized_series())?;
            self.fill_values.insert(col_name.to_string(), fill_value);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace nulls in every fitted column that is present in `df`
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, fill_value) in &self.fill_values {
            if let Ok(column) = df.column(col_name) {
                let series = column.as_materialized_series();
                if series.null_count() == 0 {
                    continue;
                }
                let filled = Self::fill_series(series, fill_value)?;
                result.with_column(filled)?;
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fill value learned for `column`
    pub fn fill_value(&self, column: &str) -> Option<&ImputeValue> {
        self.fill_values.get(column)
    }

    fn compute_fill_value(&self, name: &str, series: &Series) -> Result<ImputeValue> {
        match &self.strategy {
            ImputeStrategy::Mean => {
                let mean = numeric_values(name, series)?
                    .mean()
                    .ok_or_else(|| no_observed_values(name))?;
                Ok(ImputeValue::Numeric(mean))
            }
            ImputeStrategy::Median => {
                let median = numeric_values(name, series)?
                    .median()
                    .ok_or_else(|| no_observed_values(name))?;
                Ok(ImputeValue::Numeric(median))
            }
            ImputeStrategy::MostFrequent => {
                if series.dtype() == &DataType::String {
                    Self::compute_mode_string(name, series).map(ImputeValue::Text)
                } else {
                    Self::compute_mode_numeric(name, series).map(ImputeValue::Numeric)
                }
            }
            ImputeStrategy::Constant(val) => Ok(ImputeValue::Numeric(*val)),
            ImputeStrategy::ConstantString(val) => Ok(ImputeValue::Text(val.clone())),
        }
    }

    fn compute_mode_numeric(name: &str, series: &Series) -> Result<f64> {
        let mut counts: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
        for val in numeric_values(name, series)?.into_iter().flatten() {
            counts.entry(val.to_bits()).or_insert((val, 0)).1 += 1;
        }

        let mut best: Option<(f64, usize)> = None;
        for (val, count) in counts.into_values() {
            best = match best {
                Some((b, c)) if c > count || (c == count && b <= val) => Some((b, c)),
                _ => Some((val, count)),
            };
        }
        best.map(|(v, _)| v).ok_or_else(|| no_observed_values(name))
    }

    fn compute_mode_string(name: &str, series: &Series) -> Result<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for val in series.str()?.into_iter().flatten() {
            *counts.entry(val).or_insert(0) += 1;
        }

        // BTreeMap iterates in lexicographic order, so a strict comparison
        // keeps the smallest value among equally frequent ones.
        let mut best: Option<(&str, usize)> = None;
        for (val, count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((val, count));
            }
        }
        best.map(|(v, _)| v.to_string())
            .ok_or_else(|| no_observed_values(name))
    }

    fn fill_series(series: &Series, fill_value: &ImputeValue) -> Result<Series> {
        let name = series.name().clone();
        match fill_value {
            ImputeValue::Numeric(fill) => {
                let ca = numeric_values(name.as_str(), series)?;
                let filled: Float64Chunked = ca
                    .into_iter()
                    .map(|v| Some(v.unwrap_or(*fill)))
                    .collect();
                Ok(filled.with_name(name).into_series())
            }
            ImputeValue::Text(fill) => {
                let ca = series.str().map_err(|_| {
                    PipelineError::SchemaMismatch(format!("column {} is not text", name))
                })?;
                let filled: StringChunked = ca
                    .into_iter()
                    .map(|v| Some(v.unwrap_or(fill.as_str())))
                    .collect();
                Ok(filled.with_name(name).into_series())
            }
        }
    }
}

fn numeric_values<'a>(name: &str, series: &'a Series) -> Result<&'a Float64Chunked> {
    series
        .f64()
        .map_err(|_| PipelineError::SchemaMismatch(format!("column {} is not numeric", name)))
}

fn no_observed_values(name: &str) -> PipelineError {
    PipelineError::Data(format!("column {} has no observed values", name))
}
