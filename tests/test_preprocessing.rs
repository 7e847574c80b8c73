//! Integration test: preprocessing fitted on ingested splits
//! Tests: ingestion output → transformation → persisted preprocessor

mod common;

use regress_pipeline::artifacts::{load_object, PreprocessorArtifact};
use regress_pipeline::config::{ArtifactPaths, IngestionConfig};
use regress_pipeline::error::PipelineError;
use regress_pipeline::ingestion::{read_csv, DataIngestion};
use regress_pipeline::preprocessing::{
    DataPreprocessor, DataTransformation, HandleUnknown, PreprocessingConfig,
};
use regress_pipeline::predict::CustomData;

fn ingest(dir: &std::path::Path, n_rows: usize) -> (ArtifactPaths, regress_pipeline::ingestion::IngestionArtifacts) {
    let source = common::write_linear_csv(dir, n_rows);
    let paths = ArtifactPaths::new(dir.join("artifacts"));
    let config = IngestionConfig {
        source_path: source,
        ..IngestionConfig::default()
    };
    let artifacts = DataIngestion::new(config, paths.clone()).initiate().unwrap();
    (paths, artifacts)
}

#[test]
fn test_ingestion_split_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let (_, artifacts) = ingest(dir.path(), 61);

    // ceil(0.2 * 61) = 13
    assert_eq!(artifacts.test_rows, 13);
    assert_eq!(artifacts.train_rows, 48);
    assert_eq!(read_csv(&artifacts.raw_path).unwrap().height(), 61);
    assert_eq!(read_csv(&artifacts.test_path).unwrap().height(), 13);
}

#[test]
fn test_transformation_shapes_and_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (paths, ingested) = ingest(dir.path(), 50);

    let splits = DataTransformation::new(common::schema(), PreprocessingConfig::default(), paths.clone())
        .initiate(&ingested.train_path, &ingested.test_path)
        .unwrap();

    // two numeric columns and three category indicators, plus the target
    assert_eq!(splits.n_features(), 5);
    assert_eq!(splits.train.ncols(), 6);
    assert_eq!(splits.train.nrows(), ingested.train_rows);
    assert_eq!(splits.test.nrows(), ingested.test_rows);
    assert!(splits.train.iter().all(|v| v.is_finite()));
    assert!(splits.test.iter().all(|v| v.is_finite()));

    let artifact: PreprocessorArtifact = load_object(&paths.preprocessor()).unwrap();
    assert_eq!(artifact.schema, common::schema());
    assert_eq!(artifact.preprocessor.feature_names_out(), splits.feature_names.as_slice());
}

#[test]
fn test_target_column_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (paths, ingested) = ingest(dir.path(), 40);

    let splits = DataTransformation::new(common::schema(), PreprocessingConfig::default(), paths)
        .initiate(&ingested.train_path, &ingested.test_path)
        .unwrap();

    let train_df = read_csv(&ingested.train_path).unwrap();
    let expected = regress_pipeline::preprocessing::target_values(&train_df, &common::schema()).unwrap();
    let last = splits.train.ncols() - 1;
    let actual: Vec<f64> = splits.train.column(last).to_vec();
    assert_eq!(actual, expected);
}

#[test]
fn test_numeric_columns_are_standardized() {
    let dir = tempfile::tempdir().unwrap();
    let (paths, ingested) = ingest(dir.path(), 60);

    let splits = DataTransformation::new(common::schema(), PreprocessingConfig::default(), paths)
        .initiate(&ingested.train_path, &ingested.test_path)
        .unwrap();

    let score_a = splits.train.column(0);
    let mean = score_a.mean().unwrap();
    assert!(mean.abs() < 1e-9, "mean {}", mean);
}

#[test]
fn test_single_observation_transform() {
    let dir = tempfile::tempdir().unwrap();
    let (_, ingested) = ingest(dir.path(), 40);
    let train_df = read_csv(&ingested.train_path).unwrap();

    let mut preprocessor = DataPreprocessor::new(&common::schema());
    preprocessor.fit(&train_df).unwrap();

    let frame = CustomData::new()
        .with_field("score_a", "3")
        .with_field("score_b", "2")
        .with_field("category", "z")
        .to_frame(&common::schema())
        .unwrap();
    let row = preprocessor.transform(&frame).unwrap();
    assert_eq!(row.dim(), (1, 5));

    let unseen = CustomData::new()
        .with_field("score_a", "3")
        .with_field("score_b", "2")
        .with_field("category", "w")
        .to_frame(&common::schema())
        .unwrap();
    let row = preprocessor.transform(&unseen).unwrap();
    // unseen category encodes as all zeros
    assert!(row.slice(ndarray::s![0, 2..]).iter().all(|v| *v == 0.0));
}

#[test]
fn test_unknown_category_can_be_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (_, ingested) = ingest(dir.path(), 40);
    let train_df = read_csv(&ingested.train_path).unwrap();

    let config = PreprocessingConfig::default().with_handle_unknown(HandleUnknown::Error);
    let mut preprocessor = DataPreprocessor::with_config(&common::schema(), config);
    preprocessor.fit(&train_df).unwrap();

    let unseen = CustomData::new()
        .with_field("score_a", "3")
        .with_field("score_b", "2")
        .with_field("category", "w")
        .to_frame(&common::schema())
        .unwrap();
    match preprocessor.transform(&unseen) {
        Err(PipelineError::UnknownCategory { column, value }) => {
            assert_eq!(column, "category");
            assert_eq!(value, "w");
        }
        other => panic!("expected UnknownCategory, got {:?}", other),
    }
}
