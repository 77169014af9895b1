//! Application state management

use crate::inference::{InferenceEngine, PriceModel};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::ServerConfig;

/// Application state shared across handlers. The model is loaded once and
/// only ever read.
pub struct AppState {
    pub config: ServerConfig,
    pub engine: InferenceEngine,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, model: Arc<dyn PriceModel>) -> Self {
        Self {
            config,
            engine: InferenceEngine::new(model),
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }
}
