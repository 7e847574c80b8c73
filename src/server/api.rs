//! Route definitions

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use super::{handlers, state::AppState, views};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Html(views::render_error(
            StatusCode::NOT_FOUND,
            "Not found. Visit / or /predictdata.",
        )),
    )
}

async fn handle_405() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Html(views::render_error(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed.",
        )),
    )
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::serve_index))
        .route(
            "/predictdata",
            get(handlers::predict_form).post(handlers::predict_datapoint),
        )
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
