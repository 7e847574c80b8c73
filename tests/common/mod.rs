//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use regress_pipeline::config::{FeatureSchema, PipelineConfig};
use regress_pipeline::training::{ModelKind, TrainerConfig};

pub fn schema() -> FeatureSchema {
    FeatureSchema::new(&["score_a", "score_b"], &["category"], "target")
}

/// `target = 2 * score_a + 1`; one `score_b` cell is left empty
pub fn write_linear_csv(dir: &Path, n_rows: usize) -> PathBuf {
    write_csv(dir, n_rows, |_, a| 2.0 * a + 1.0)
}

/// Target unrelated to the features
pub fn write_noise_csv(dir: &Path, n_rows: usize) -> PathBuf {
    write_csv(dir, n_rows, |i, _| ((i * 7919 + 13) % 97) as f64)
}

fn write_csv(dir: &Path, n_rows: usize, target: impl Fn(usize, f64) -> f64) -> PathBuf {
    let categories = ["x", "y", "z"];
    let mut csv = String::from("score_a,score_b,category,target\n");
    for i in 0..n_rows {
        let a = (i % 17) as f64 + (i / 17) as f64 * 0.5;
        let b = if i == 3 { String::new() } else { ((i * 7) % 11).to_string() };
        csv.push_str(&format!("{},{},{},{}\n", a, b, categories[i % 3], target(i, a)));
    }
    let path = dir.join("source.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

/// Fast trainer: a few models fitted once with defaults
pub fn quick_trainer() -> TrainerConfig {
    TrainerConfig::default()
        .with_models(vec![
            ModelKind::LinearRegression,
            ModelKind::Ridge,
            ModelKind::KNeighbors,
            ModelKind::DecisionTree,
        ])
        .without_search()
}

pub fn config(source: &Path, artifacts: &Path, trainer: TrainerConfig) -> PipelineConfig {
    PipelineConfig::default()
        .with_source(source)
        .with_artifacts_dir(artifacts)
        .with_schema(schema())
        .with_trainer(trainer)
}
