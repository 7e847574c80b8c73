//! Application state shared across handlers

use crate::predict::{FormSchema, PredictPipeline};

use super::ServerConfig;

/// Read-only state; artifacts are loaded per request by the pipeline
pub struct AppState {
    pub config: ServerConfig,
    pub pipeline: PredictPipeline,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            pipeline: PredictPipeline::from_paths(&config.artifacts),
            config,
            started_at: chrono::Utc::now(),
        }
    }

    /// Form layout from the configured schema, without vocabularies
    pub fn fallback_form(&self) -> FormSchema {
        FormSchema {
            schema: self.config.schema.clone(),
            vocabularies: Vec::new(),
        }
    }
}
