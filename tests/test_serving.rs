//! Integration test: prediction form over HTTP
//! Tests: landing page, form rendering, form submission, error statuses

mod common;

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use regress_pipeline::config::ArtifactPaths;
use regress_pipeline::pipeline::TrainingPipeline;
use regress_pipeline::server::{create_router, AppState, ServerConfig};

fn router(artifacts: &Path) -> Router {
    let config = ServerConfig::default()
        .with_artifacts(ArtifactPaths::new(artifacts))
        .with_schema(common::schema());
    create_router(Arc::new(AppState::new(config)))
}

fn train(dir: &Path) -> std::path::PathBuf {
    let source = common::write_linear_csv(dir, 45);
    let artifacts = dir.join("artifacts");
    let config = common::config(&source, &artifacts, common::quick_trainer());
    TrainingPipeline::new(config).run().unwrap();
    artifacts
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form_post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predictdata")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn prediction_in(html: &str) -> f64 {
    let marker = "<strong id=\"prediction\">";
    let start = html.find(marker).expect("no prediction in page") + marker.len();
    let end = start + html[start..].find('<').unwrap();
    html[start..end].parse().unwrap()
}

#[tokio::test]
async fn test_landing_page() {
    let dir = tempfile::tempdir().unwrap();
    let response = router(dir.path())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("href=\"/predictdata\""));
}

#[tokio::test]
async fn test_form_without_artifacts_uses_text_fields() {
    let dir = tempfile::tempdir().unwrap();
    let response = router(dir.path())
        .oneshot(Request::builder().uri("/predictdata").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("name=\"score_a\""));
    assert!(html.contains("name=\"category\" type=\"text\""));
    assert!(!html.contains("id=\"prediction\""));
}

#[tokio::test]
async fn test_form_after_training_offers_categories() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = train(dir.path());

    let response = router(&artifacts)
        .oneshot(Request::builder().uri("/predictdata").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<select id=\"category\" name=\"category\" required>"));
    for option in ["x", "y", "z"] {
        assert!(html.contains(&format!("<option value=\"{0}\">{0}</option>", option)));
    }
}

#[tokio::test]
async fn test_submit_renders_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = train(dir.path());

    let response = router(&artifacts)
        .oneshot(form_post("score_a=5&score_b=4&category=y"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    let prediction = prediction_in(&html);
    assert!((prediction - 11.0).abs() < 0.05, "prediction {}", prediction);
    // submitted values are echoed back
    assert!(html.contains("value=\"5\""));
}

#[tokio::test]
async fn test_submit_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = train(dir.path());
    let app = router(&artifacts);

    let response = app
        .clone()
        .oneshot(form_post("score_a=abc&score_b=4&category=y"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains("score_a"));

    let response = app.oneshot(form_post("score_a=5&category=y")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let response = router(dir.path())
        .oneshot(form_post("score_a=5&score_b=4&category=y"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/predictdata")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
