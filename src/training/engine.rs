//! Training procedure
//!
//! CSV rows → price outlier filter → preparer → selector → `log1p` target →
//! seeded hold-out split → randomized search on the training split → refit
//! of the best candidate → held-out evaluation.

use crate::error::{PricerError, Result};
use crate::inference::{PriceModel, PricePipeline};
use crate::preprocessing::{coerce_numeric, prepare, select, target, RawRecord, PRICE_COLUMN};
use crate::utils::DataLoader;
use super::config::TrainingConfig;
use super::cross_validation::train_test_split;
use super::metrics::RegressionMetrics;
use super::random_forest::ForestParams;
use super::search::{RandomizedSearch, Study};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// What a training run did and how well the result scored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Rows read from the source
    pub n_input_rows: usize,
    /// Rows dropped by the price filter
    pub n_price_filtered: usize,
    /// Rows dropped by the feature preparer
    pub n_rejected: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub best_params: ForestParams,
    /// Mean cross-validated R² of the best candidate
    pub cv_r2: f64,
    /// Held-out metrics on the log-scale target
    pub test_metrics: RegressionMetrics,
    pub study: Study,
    pub duration_secs: f64,
}

/// Offline trainer for the price pipeline
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Keep rows whose price is a number in `(0, price_ceiling)`
    pub fn filter_price_outliers(&self, records: &[RawRecord]) -> Vec<RawRecord> {
        records
            .iter()
            .filter(|record| {
                record
                    .get(PRICE_COLUMN)
                    .and_then(coerce_numeric)
                    .map_or(false, |price| price > 0.0 && price < self.config.price_ceiling)
            })
            .cloned()
            .collect()
    }

    /// Fit a pipeline on historical rows.
    ///
    /// Any failure is fatal to the run; nothing partial is returned.
    pub fn train(&self, records: &[RawRecord]) -> Result<(PricePipeline, TrainingReport)> {
        self.config.validate()?;
        let start = Instant::now();
        let seed = self.config.random_state;

        let kept = self.filter_price_outliers(records);
        let n_price_filtered = records.len() - kept.len();
        info!(
            rows = records.len(),
            dropped = n_price_filtered,
            ceiling = self.config.price_ceiling,
            "Applied price filter"
        );

        let batch = prepare(&kept);
        if !batch.is_clean() {
            warn!(rejected = batch.rejected.len(), "Dropped rows that failed cleaning");
        }

        let (features, prices) = select(&batch.table)?;
        let prices = prices.ok_or_else(|| {
            PricerError::DataError(format!("training data has no '{}' column", PRICE_COLUMN))
        })?;
        if features.is_empty() {
            return Err(PricerError::TrainingError(
                "no usable rows left after filtering and cleaning".to_string(),
            ));
        }

        let y = target::prices_to_log_space(&prices);
        let split = train_test_split(features.len(), self.config.test_size, seed)?;

        let x_train = features.take(&split.train_indices);
        let x_test = features.take(&split.test_indices);
        let y_train: Array1<f64> = split.train_indices.iter().map(|&i| y[i]).collect();
        let y_test: Array1<f64> = split.test_indices.iter().map(|&i| y[i]).collect();

        info!(
            train = x_train.len(),
            test = x_test.len(),
            n_iter = self.config.search.n_iter,
            cv_folds = self.config.search.cv_folds,
            "Starting randomized search"
        );

        let study = RandomizedSearch::new(self.config.search.clone(), seed).fit(&x_train, &y_train)?;
        let best = study
            .best_trial()
            .ok_or_else(|| PricerError::TrainingError("search produced no candidate".to_string()))?;
        let best_params = best.params;
        let cv_r2 = best.value;

        info!(cv_r2, params = %best_params, "Refitting best candidate");

        let pipeline = PricePipeline::fit(&x_train, &y_train, &best_params, seed)?;

        let predictions = Array1::from(pipeline.predict_log(&x_test)?);
        let test_metrics = RegressionMetrics::compute(&y_test, &predictions)?;
        let pipeline = pipeline.with_scores(cv_r2, test_metrics);

        info!(r2 = test_metrics.r2, rmse_log = test_metrics.rmse, "Evaluated on held-out split");

        let report = TrainingReport {
            n_input_rows: records.len(),
            n_price_filtered,
            n_rejected: batch.rejected.len(),
            n_train: x_train.len(),
            n_test: x_test.len(),
            best_params,
            cv_r2,
            test_metrics,
            study,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        Ok((pipeline, report))
    }

    /// Load the configured CSV, train, and write the artifact
    pub fn run(&self) -> Result<TrainingReport> {
        let records = DataLoader::new().load_records(&self.config.data_path)?;
        let (pipeline, report) = self.train(&records)?;

        pipeline.save(&self.config.output_path)?;
        info!(path = %self.config.output_path.display(), "Saved model artifact");

        Ok(report)
    }
}
