//! Request handlers

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::Uri, Json};
use serde_json::{json, Value};

use crate::inference::{panic_message, PredictPayload, PredictionOutput};

use super::error::{Result, ServerError};
use super::state::AppState;

pub const INDEX_MESSAGE: &str = "PakWheels price predictor - send POST to /predict";

pub async fn index() -> Json<Value> {
    Json(json!({ "message": INDEX_MESSAGE }))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime_secs(),
        "model": state.engine.model().summary(),
        "stats": state.engine.stats(),
    }))
}

/// `POST /predict`. The body is parsed by hand so any malformed or
/// unexpected body, whatever its content type, gets the same 400.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictionOutput>> {
    let payload = PredictPayload::from_slice(&body)?;

    // Forest traversal is CPU-bound; keep it off the async workers
    let worker = Arc::clone(&state);
    let output = tokio::task::spawn_blocking(move || worker.engine.predict(payload))
        .await
        .map_err(|e| {
            if e.is_panic() {
                ServerError::Prediction(panic_message(e.into_panic().as_ref()))
            } else {
                ServerError::Internal(format!("prediction task failed: {}", e))
            }
        })??;

    Ok(Json(output))
}

pub async fn not_found(uri: Uri) -> ServerError {
    ServerError::NotFound(uri.path().to_string())
}

pub async fn method_not_allowed() -> ServerError {
    ServerError::MethodNotAllowed
}
