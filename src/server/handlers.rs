//! Request handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Form, State},
    response::Html,
};
use tracing::{debug, info};

use super::error::{Result, ServerError};
use super::state::AppState;
use super::views;
use crate::predict::CustomData;

pub async fn serve_index() -> Html<String> {
    Html(views::render_index())
}

/// Empty form; falls back to free-text fields when no preprocessor exists yet
pub async fn predict_form(State(state): State<Arc<AppState>>) -> Html<String> {
    let pipeline = state.pipeline.clone();
    let form = match tokio::task::spawn_blocking(move || pipeline.schema()).await {
        Ok(Ok(form)) => form,
        Ok(Err(e)) => {
            debug!(error = %e, "Rendering form from the configured schema");
            state.fallback_form()
        }
        Err(e) => {
            debug!(error = %e, "Schema task failed");
            state.fallback_form()
        }
    };
    Html(views::render_form(&form, &CustomData::new(), None))
}

pub async fn predict_datapoint(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Html<String>> {
    let data = CustomData::from(fields);
    let pipeline = state.pipeline.clone();
    let input = data.clone();

    let (prediction, form) = tokio::task::spawn_blocking(move || {
        let prediction = pipeline.predict(&input)?;
        let form = pipeline.schema()?;
        Ok::<_, crate::error::PipelineError>((prediction, form))
    })
    .await
    .map_err(|e| ServerError::Internal(format!("prediction task failed: {}", e)))??;

    info!(prediction, fields = data.len(), "Prediction served");
    Ok(Html(views::render_form(&form, &data, Some(prediction))))
}
