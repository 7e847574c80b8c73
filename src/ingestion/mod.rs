//! Data ingestion
//!
//! Reads the raw dataset, splits it into train and test partitions with a
//! seeded shuffle and writes raw/train/test copies to the artifacts directory.

use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::config::{ArtifactPaths, IngestionConfig};
use crate::error::{PipelineError, Result};

/// Files written by [`DataIngestion::initiate`]
#[derive(Debug, Clone)]
pub struct IngestionArtifacts {
    pub raw_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Ingestion stage of the offline pipeline
pub struct DataIngestion {
    config: IngestionConfig,
    paths: ArtifactPaths,
}

impl DataIngestion {
    pub fn new(config: IngestionConfig, paths: ArtifactPaths) -> Self {
        Self { config, paths }
    }

    /// Read the source dataset, split it and persist the three copies
    pub fn initiate(&self) -> Result<IngestionArtifacts> {
        let start = Instant::now();
        let source = &self.config.source_path;
        info!(source = %source.display(), "Entered data ingestion");

        let mut raw = read_csv(source).map_err(|e| ingestion_error(source, e))?;
        info!(rows = raw.height(), cols = raw.width(), "Read the dataset as a data frame");

        std::fs::create_dir_all(&self.paths.dir).map_err(|e| {
            PipelineError::Ingestion(format!("cannot create {}: {}", self.paths.dir.display(), e))
        })?;

        let raw_path = self.paths.raw_data();
        write_csv(&mut raw, &raw_path).map_err(|e| ingestion_error(&raw_path, e))?;

        let (mut train, mut test) =
            train_test_split(&raw, self.config.test_size, self.config.seed)?;
        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            seed = self.config.seed,
            "Train test split initiated"
        );

        let train_path = self.paths.train_data();
        let test_path = self.paths.test_data();
        write_csv(&mut train, &train_path).map_err(|e| ingestion_error(&train_path, e))?;
        write_csv(&mut test, &test_path).map_err(|e| ingestion_error(&test_path, e))?;

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Ingestion of the data is completed");

        Ok(IngestionArtifacts {
            raw_path,
            train_path,
            test_path,
            train_rows: train.height(),
            test_rows: test.height(),
        })
    }
}

fn ingestion_error(path: &Path, err: PipelineError) -> PipelineError {
    PipelineError::Ingestion(format!("{}: {}", path.display(), err))
}

/// Number of test rows for a dataset of `n_rows`: `ceil(test_size * n_rows)`
pub fn test_row_count(n_rows: usize, test_size: f64) -> usize {
    (test_size * n_rows as f64).ceil() as usize
}

/// Shuffle rows with a seeded RNG and cut off `ceil(test_size * n)` test rows.
pub fn train_test_split(
    df: &DataFrame,
    test_size: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::Config(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n = df.height();
    if n == 0 {
        return Err(PipelineError::Ingestion("dataset has no rows".to_string()));
    }

    let n_test = test_row_count(n, test_size);
    if n_test >= n {
        return Err(PipelineError::Ingestion(format!(
            "{} rows with test_size {} leaves no training rows",
            n, test_size
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_idx = IdxCa::from_vec("idx".into(), indices[..n_test].to_vec());
    let train_idx = IdxCa::from_vec("idx".into(), indices[n_test..].to_vec());

    Ok((df.take(&train_idx)?, df.take(&test_idx)?))
}

/// Read a CSV file with a header row
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(PipelineError::Data(format!("file not found: {}", path.display())));
    }
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Write a data frame as CSV with a header row, replacing any existing file
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
