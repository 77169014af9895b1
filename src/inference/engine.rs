//! Inference procedure
//!
//! Raw records go through the same preparer and selector as training, then
//! the model, then back from log space to PKR. Validation failures surface
//! before the model is called; failures inside the model become
//! [`PricerError::PredictionError`].

use crate::error::{PricerError, Result};
use crate::preprocessing::{prepare, select, target, RawRecord};
use super::payload::PredictPayload;
use super::pipeline::PriceModel;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Prices for one request, shaped by how many were produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    Single { predicted_price: f64 },
    Batch { predicted_prices: Vec<f64> },
}

impl PredictionOutput {
    /// Exactly one price becomes `Single`; any other count is a `Batch`
    pub fn from_prices(mut prices: Vec<f64>) -> Self {
        match prices.len() {
            1 => PredictionOutput::Single {
                predicted_price: prices.remove(0),
            },
            _ => PredictionOutput::Batch {
                predicted_prices: prices,
            },
        }
    }

    pub fn prices(&self) -> &[f64] {
        match self {
            PredictionOutput::Single { predicted_price } => std::slice::from_ref(predicted_price),
            PredictionOutput::Batch { predicted_prices } => predicted_prices,
        }
    }
}

/// Predict a price in PKR for every record, in input order.
///
/// Fails with [`PricerError::MissingColumns`] when a required column is
/// absent, then [`PricerError::InvalidRows`] when any row fails cleaning. The
/// model is only called once both checks pass.
pub fn predict_prices(model: &dyn PriceModel, records: &[RawRecord]) -> Result<Vec<f64>> {
    let batch = prepare(records);
    let (features, _) = select(&batch.table)?;

    if !batch.is_clean() {
        return Err(PricerError::InvalidRows(batch.rejected));
    }
    if features.is_empty() {
        return Ok(Vec::new());
    }

    // A corrupted artifact can index out of bounds inside the model
    let log_prices = panic::catch_unwind(AssertUnwindSafe(|| model.predict_log(&features)))
        .map_err(|payload| PricerError::PredictionError(panic_message(payload.as_ref())))?
        .map_err(|e| match e {
            PricerError::PredictionError(msg) => PricerError::PredictionError(msg),
            other => PricerError::PredictionError(other.to_string()),
        })?;

    if log_prices.len() != features.len() {
        return Err(PricerError::PredictionError(format!(
            "model returned {} predictions for {} rows",
            log_prices.len(),
            features.len()
        )));
    }

    Ok(target::log_space_to_prices(&log_prices))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("model panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("model panicked: {}", msg)
    } else {
        "model panicked".to_string()
    }
}

/// Inference statistics snapshot
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_requests: u64,
    pub total_predictions: u64,
    pub error_count: u64,
}

/// Shared, read-only model plus request counters
pub struct InferenceEngine {
    model: Arc<dyn PriceModel>,
    total_requests: AtomicU64,
    total_predictions: AtomicU64,
    error_count: AtomicU64,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("stats", &self.stats())
            .finish()
    }
}

impl InferenceEngine {
    pub fn new(model: Arc<dyn PriceModel>) -> Self {
        Self {
            model,
            total_requests: AtomicU64::new(0),
            total_predictions: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &Arc<dyn PriceModel> {
        &self.model
    }

    /// Predict for a parsed request body
    pub fn predict(&self, payload: PredictPayload) -> Result<PredictionOutput> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let records = payload.into_records();
        match predict_prices(self.model.as_ref(), &records) {
            Ok(prices) => {
                self.total_predictions
                    .fetch_add(prices.len() as u64, Ordering::Relaxed);
                debug!(rows = records.len(), "Predicted batch");
                Ok(PredictionOutput::from_prices(prices))
            }
            Err(e) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_predictions: self.total_predictions.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
        }
    }
}
