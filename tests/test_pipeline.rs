//! Integration test: offline pipeline and prediction from its artifacts
//! Tests: ingest → transform → train → persist → predict

mod common;

use regress_pipeline::error::PipelineError;
use regress_pipeline::ingestion::read_csv;
use regress_pipeline::pipeline::TrainingPipeline;
use regress_pipeline::predict::{CustomData, PredictPipeline};
use regress_pipeline::training::{ModelKind, TrainerConfig};

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_linear_target_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::write_linear_csv(dir.path(), 60);
    let artifacts = dir.path().join("artifacts");

    let trainer = TrainerConfig::default().without_search();
    let config = common::config(&source, &artifacts, trainer);
    let paths = config.artifacts.clone();
    let summary = TrainingPipeline::new(config).run().unwrap();

    assert_eq!(summary.ingestion.train_rows, 48);
    assert_eq!(summary.ingestion.test_rows, 12);
    assert_eq!(summary.outcome.report.len(), ModelKind::all().len());
    assert!(
        ["Linear Regression", "Lasso", "Ridge"].contains(&summary.outcome.best_model.as_str()),
        "unexpected winner {}",
        summary.outcome.best_model
    );
    assert!(summary.outcome.r2 > 0.99, "r2 {}", summary.outcome.r2);

    for path in [paths.raw_data(), paths.train_data(), paths.test_data(), paths.preprocessor(), paths.model()] {
        assert!(path.is_file(), "missing {}", path.display());
    }

    let observation = CustomData::new()
        .with_field("score_a", "5")
        .with_field("score_b", "4")
        .with_field("category", "y");
    let prediction = PredictPipeline::from_paths(&paths).predict(&observation).unwrap();
    assert!((prediction - 11.0).abs() < 0.05, "prediction {}", prediction);
}

#[test]
fn test_predictions_reproduce_test_scoring() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::write_linear_csv(dir.path(), 45);
    let artifacts = dir.path().join("artifacts");

    let config = common::config(&source, &artifacts, common::quick_trainer());
    let paths = config.artifacts.clone();
    let summary = TrainingPipeline::new(config).run().unwrap();

    let test_df = read_csv(&paths.test_data()).unwrap();
    let replayed = PredictPipeline::from_paths(&paths).predict_frame(&test_df).unwrap();

    assert_eq!(replayed.len(), summary.outcome.test_predictions.len());
    for (a, b) in replayed.iter().zip(&summary.outcome.test_predictions) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }
}

#[test]
fn test_same_seed_same_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::write_linear_csv(dir.path(), 40);

    let run = |name: &str| {
        let config = common::config(&source, &dir.path().join(name), common::quick_trainer());
        TrainingPipeline::new(config).run().unwrap()
    };
    let first = run("a");
    let second = run("b");

    assert_eq!(first.outcome.best_model, second.outcome.best_model);
    assert_eq!(first.outcome.test_predictions, second.outcome.test_predictions);
}

#[test]
fn test_unseen_category_is_ignored_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::write_linear_csv(dir.path(), 40);
    let config = common::config(&source, &dir.path().join("artifacts"), common::quick_trainer());
    let paths = config.artifacts.clone();
    TrainingPipeline::new(config).run().unwrap();

    let observation = CustomData::new()
        .with_field("score_a", "2")
        .with_field("score_b", "1")
        .with_field("category", "never-seen");
    assert!(PredictPipeline::from_paths(&paths).predict(&observation).is_ok());
}

// ============================================================================
// Failure paths
// ============================================================================

#[test]
fn test_noise_target_fails_quality_gate() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::write_noise_csv(dir.path(), 60);
    let config = common::config(&source, &dir.path().join("artifacts"), common::quick_trainer());
    let paths = config.artifacts.clone();

    let err = TrainingPipeline::new(config).run().unwrap_err();
    assert!(
        matches!(err.root(), PipelineError::NoAcceptableModel { floor, .. } if *floor == 0.6),
        "unexpected error {}",
        err
    );
    assert!(!paths.model().exists());
    assert!(!paths.preprocessor().exists());
    // the split copies stay for inspection
    assert!(paths.train_data().is_file());
}

#[test]
fn test_failed_retrain_removes_previous_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = dir.path().join("artifacts");
    let good = common::write_linear_csv(dir.path(), 40);
    let config = common::config(&good, &artifacts, common::quick_trainer());
    let paths = config.artifacts.clone();
    TrainingPipeline::new(config).run().unwrap();
    assert!(paths.preprocessor().is_file());

    let noise = common::write_noise_csv(dir.path(), 60);
    let config = common::config(&noise, &artifacts, common::quick_trainer());
    assert!(TrainingPipeline::new(config).run().is_err());

    assert!(!paths.model().exists());
    assert!(!paths.preprocessor().exists());
}

#[test]
fn test_missing_source_is_ingestion_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(
        &dir.path().join("nope.csv"),
        &dir.path().join("artifacts"),
        common::quick_trainer(),
    );

    let err = TrainingPipeline::new(config).run().unwrap_err();
    assert!(matches!(err.root(), PipelineError::Ingestion(_)));
    assert!(err.to_string().contains(".rs:"), "no location in {}", err);
}

#[test]
fn test_missing_target_is_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.csv");
    let mut csv = String::from("score_a,score_b,category\n");
    for i in 0..20 {
        csv.push_str(&format!("{},{},x\n", i, i % 4));
    }
    std::fs::write(&source, csv).unwrap();

    let config = common::config(&source, &dir.path().join("artifacts"), common::quick_trainer());
    let err = TrainingPipeline::new(config).run().unwrap_err();
    assert!(matches!(err.root(), PipelineError::SchemaMismatch(_)));
}

#[test]
fn test_missing_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = PredictPipeline::new(dir.path().join("preprocessor.bin"), dir.path().join("model.bin"));
    let observation = CustomData::new()
        .with_field("score_a", "5")
        .with_field("score_b", "4")
        .with_field("category", "y");

    match pipeline.predict(&observation) {
        Err(PipelineError::ArtifactNotFound { path }) => {
            assert!(path.ends_with("preprocessor.bin"));
        }
        other => panic!("expected ArtifactNotFound, got {:?}", other),
    }
}

#[test]
fn test_malformed_observation_is_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::write_linear_csv(dir.path(), 40);
    let config = common::config(&source, &dir.path().join("artifacts"), common::quick_trainer());
    let paths = config.artifacts.clone();
    TrainingPipeline::new(config).run().unwrap();

    let pipeline = PredictPipeline::from_paths(&paths);
    let missing = CustomData::new().with_field("score_a", "5");
    assert!(matches!(pipeline.predict(&missing), Err(PipelineError::BadInput(_))));

    let text = CustomData::new()
        .with_field("score_a", "five")
        .with_field("score_b", "4")
        .with_field("category", "y");
    assert!(matches!(pipeline.predict(&text), Err(PipelineError::BadInput(_))));
}
