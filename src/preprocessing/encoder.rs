//! One-hot categorical encoding

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// What to do with a category that was not seen during fit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleUnknown {
    /// Encode as all zeros
    #[default]
    Ignore,
    /// Fail with `UnknownCategory`
    Error,
}

/// One-hot encoder with a sorted vocabulary per column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    handle_unknown: HandleUnknown,
    /// Column name and its sorted categories, in fit order
    categories: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new(handle_unknown: HandleUnknown) -> Self {
        Self {
            handle_unknown,
            categories: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn the vocabulary of each column
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.categories.clear();
        for col_name in columns {
            let ca = text_column(df, col_name)?;
            let mut vocab: Vec<String> = ca.into_iter().flatten().map(|s| s.to_string()).collect();
            vocab.sort();
            vocab.dedup();
            self.categories.push((col_name.to_string(), vocab));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace each fitted column with one `f64` indicator column per category.
    /// Only the indicator columns are returned, in [`Self::output_names`] order.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut columns: Vec<Column> = Vec::with_capacity(self.n_outputs());
        for (col_name, vocab) in &self.categories {
            let ca = text_column(df, col_name)?;

            if self.handle_unknown == HandleUnknown::Error {
                if let Some(unknown) = ca
                    .into_iter()
                    .flatten()
                    .find(|v| vocab.binary_search_by(|c| c.as_str().cmp(*v)).is_err())
                {
                    return Err(PipelineError::UnknownCategory {
                        column: col_name.clone(),
                        value: unknown.to_string(),
                    });
                }
            }

            for category in vocab {
                let values: Vec<f64> = ca
                    .into_iter()
                    .map(|v| if v == Some(category.as_str()) { 1.0 } else { 0.0 })
                    .collect();
                columns.push(Column::new(indicator_name(col_name, category).into(), values));
            }
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Indicator column names, `<column>_<category>`
    pub fn output_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|(col, vocab)| vocab.iter().map(move |cat| indicator_name(col, cat)))
            .collect()
    }

    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(|(_, v)| v.len()).sum()
    }

    /// Sorted categories seen for `column` during fit
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, vocab)| vocab.as_slice())
    }

    /// All vocabularies in fit order
    pub fn vocabularies(&self) -> &[(String, Vec<String>)] {
        &self.categories
    }
}

fn indicator_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    df.column(name)
        .map_err(|_| PipelineError::SchemaMismatch(format!("missing column {}", name)))?
        .str()
        .map_err(|_| PipelineError::SchemaMismatch(format!("column {} is not text", name)))
}
