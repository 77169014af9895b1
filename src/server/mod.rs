//! Prediction server
//!
//! Loads the fitted pipeline once at startup and serves `GET /`,
//! `GET /health` and `POST /predict`. A missing or unreadable artifact stops
//! startup; there is no degraded mode without a model.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::INDEX_MESSAGE;
pub use state::AppState;

use crate::error::{PricerError, Result};
use crate::inference::PricePipeline;
use crate::training::{TrainEngine, TrainingConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Fitted pipeline loaded at startup
    pub model_path: PathBuf,
    /// Allowed CORS origin; `None` or `*` allows any
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_port(std::env::var("PORT").ok().as_deref()),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("artifacts/car_price_model.bin")),
            cors_origin: std::env::var("CORS_ORIGIN").ok(),
        }
    }
}

const DEFAULT_PORT: u16 = 5000;

/// `PORT` value, or the default when unset. An unparsable value is logged
/// and replaced by the default.
fn parse_port(raw: Option<&str>) -> u16 {
    match raw.map(str::trim) {
        None | Some("") => DEFAULT_PORT,
        Some(value) => value.parse().unwrap_or_else(|e| {
            warn!(port = %value, error = %e, default = DEFAULT_PORT, "Invalid PORT, using default");
            DEFAULT_PORT
        }),
    }
}

/// Load the artifact at `model_path`. When it is missing and `train_data` is
/// given, train on that CSV first and write the artifact.
pub fn load_or_train(model_path: &Path, train_data: Option<&Path>) -> Result<PricePipeline> {
    if !model_path.exists() {
        match train_data {
            Some(data) => {
                info!(
                    model_path = %model_path.display(),
                    data = %data.display(),
                    "Model artifact missing, training one"
                );
                let config = TrainingConfig::default()
                    .with_data_path(data)
                    .with_output_path(model_path);
                if let Err(e) = TrainEngine::new(config).run() {
                    error!(error = %e, "Automatic training failed");
                }
            }
            None => warn!(model_path = %model_path.display(), "Model artifact missing"),
        }
    }

    PricePipeline::load(model_path).map_err(|e| match e {
        PricerError::ModelUnavailable(msg) => PricerError::ModelUnavailable(msg),
        other => PricerError::ModelUnavailable(format!(
            "cannot load {}: {}",
            model_path.display(),
            other
        )),
    })
}

/// Start the server with an already loaded model
pub async fn run_server(config: ServerConfig, model: PricePipeline) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let meta = model.metadata();
    info!(
        model_path = %config.model_path.display(),
        trained_at = %meta.trained_at.to_rfc3339(),
        n_estimators = meta.params.n_estimators,
        "Model loaded"
    );

    let state = Arc::new(AppState::new(config.clone(), Arc::new(model)));
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        pid = std::process::id(),
        started_at = %start_time.to_rfc3339(),
        "Server listening and ready to accept connections"
    );

    // Graceful shutdown on ctrl+c
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install ctrl+c handler");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
