//! The fitted pipeline: encoder and forest persisted as one artifact

use crate::error::{PricerError, Result};
use crate::preprocessing::{FeatureEncoder, FeatureTable, FEATURE_COLUMNS};
use crate::training::{ForestParams, RandomForest, RegressionMetrics};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Anything that can turn feature rows into log-space price predictions.
///
/// The server holds its model behind this trait so tests can swap in doubles.
pub trait PriceModel: Send + Sync {
    /// One `log1p(price)` prediction per row, in row order
    fn predict_log(&self, features: &FeatureTable) -> Result<Vec<f64>>;

    /// Description of the model for health checks
    fn summary(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// What the training run recorded about the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Input columns, in the order the pipeline was trained on
    pub feature_columns: Vec<String>,
    pub params: ForestParams,
    /// Mean cross-validated R² of the chosen parameters
    pub cv_r2: Option<f64>,
    /// Held-out metrics on the log-scale target
    pub test_metrics: Option<RegressionMetrics>,
    /// Encoded column name and importance, most important first
    pub feature_importances: Vec<(String, f64)>,
    pub n_train_samples: usize,
    pub trained_at: DateTime<Utc>,
    /// Crate version that wrote the artifact
    pub crate_version: String,
}

/// Encoder plus regressor, saved and loaded as a single unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePipeline {
    encoder: FeatureEncoder,
    regressor: RandomForest,
    metadata: PipelineMetadata,
}

impl PricePipeline {
    /// Fit the encoder and a forest with `params` on log-space targets
    pub fn fit(
        features: &FeatureTable,
        y_log: &Array1<f64>,
        params: &ForestParams,
        seed: u64,
    ) -> Result<Self> {
        if features.is_empty() {
            return Err(PricerError::TrainingError(
                "no training rows left after cleaning".to_string(),
            ));
        }

        let mut encoder = FeatureEncoder::new();
        let x = encoder.fit_transform(features)?;

        let mut regressor = RandomForest::from_params(params, seed);
        regressor.fit(&x, y_log)?;

        let mut feature_importances: Vec<(String, f64)> = match regressor.feature_importances() {
            Some(imp) => encoder
                .feature_names()
                .into_iter()
                .zip(imp.iter().copied())
                .collect(),
            None => Vec::new(),
        };
        feature_importances.sort_by(|a, b| b.1.total_cmp(&a.1));

        let metadata = PipelineMetadata {
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            params: *params,
            cv_r2: None,
            test_metrics: None,
            feature_importances,
            n_train_samples: features.len(),
            trained_at: Utc::now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(Self {
            encoder,
            regressor,
            metadata,
        })
    }

    /// Record search and evaluation results
    pub fn with_scores(mut self, cv_r2: f64, test_metrics: RegressionMetrics) -> Self {
        self.metadata.cv_r2 = Some(cv_r2);
        self.metadata.test_metrics = Some(test_metrics);
        self
    }

    pub fn metadata(&self) -> &PipelineMetadata {
        &self.metadata
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn regressor(&self) -> &RandomForest {
        &self.regressor
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes and check the artifact matches this build's columns
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let pipeline: Self = bincode::deserialize(bytes)?;
        pipeline.check_compatible()?;
        Ok(pipeline)
    }

    /// Write the artifact, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Read an artifact written by [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PricerError::ModelUnavailable(format!(
                "no model artifact at {}",
                path.display()
            )));
        }

        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    fn check_compatible(&self) -> Result<()> {
        if self.metadata.feature_columns != FEATURE_COLUMNS {
            return Err(PricerError::ModelUnavailable(format!(
                "artifact was trained on columns {:?}, expected {:?}",
                self.metadata.feature_columns, FEATURE_COLUMNS
            )));
        }
        if !self.encoder.is_fitted() || !self.encoder.has_valid_layout() {
            return Err(PricerError::ModelUnavailable(
                "artifact encoder does not cover the categorical features".to_string(),
            ));
        }
        if self.encoder.n_output_features() != self.regressor.n_features() {
            return Err(PricerError::ModelUnavailable(format!(
                "encoder produces {} columns but the regressor expects {}",
                self.encoder.n_output_features(),
                self.regressor.n_features()
            )));
        }
        Ok(())
    }
}

impl PriceModel for PricePipeline {
    fn predict_log(&self, features: &FeatureTable) -> Result<Vec<f64>> {
        let x = self.encoder.transform(features)?;
        Ok(self.regressor.predict(&x)?.to_vec())
    }

    fn summary(&self) -> serde_json::Value {
        let meta = &self.metadata;
        json!({
            "algorithm": "random_forest",
            "n_estimators": meta.params.n_estimators,
            "max_depth": meta.params.max_depth,
            "min_samples_split": meta.params.min_samples_split,
            "min_samples_leaf": meta.params.min_samples_leaf,
            "max_features": meta.params.max_features,
            "feature_columns": meta.feature_columns,
            "cv_r2": meta.cv_r2,
            "test_r2": meta.test_metrics.map(|m| m.r2),
            "test_rmse_log": meta.test_metrics.map(|m| m.rmse),
            "n_train_samples": meta.n_train_samples,
            "trained_at": meta.trained_at.to_rfc3339(),
        })
    }
}
