//! Training configuration

use crate::error::{PricerError, Result};
use super::random_forest::MaxFeatures;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Half-open integer range `[low, high)` sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: usize,
    pub high: usize,
}

impl IntRange {
    pub fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.low >= self.high {
            return Err(PricerError::ConfigError(format!(
                "{} range [{}, {}) is empty",
                name, self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Distributions the randomized search draws forest parameters from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    pub n_estimators: IntRange,
    pub max_depth: IntRange,
    pub min_samples_split: IntRange,
    pub min_samples_leaf: IntRange,
    pub max_features: Vec<MaxFeatures>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            n_estimators: IntRange::new(200, 800),
            max_depth: IntRange::new(5, 30),
            min_samples_split: IntRange::new(2, 10),
            min_samples_leaf: IntRange::new(1, 5),
            max_features: vec![MaxFeatures::Sqrt, MaxFeatures::Log2, MaxFeatures::All],
        }
    }
}

impl SearchSpace {
    pub fn validate(&self) -> Result<()> {
        self.n_estimators.validate("n_estimators")?;
        self.max_depth.validate("max_depth")?;
        self.min_samples_split.validate("min_samples_split")?;
        self.min_samples_leaf.validate("min_samples_leaf")?;
        if self.n_estimators.low == 0 {
            return Err(PricerError::ConfigError(
                "n_estimators must start at 1 or more".to_string(),
            ));
        }
        if self.min_samples_split.low < 2 {
            return Err(PricerError::ConfigError(
                "min_samples_split must start at 2 or more".to_string(),
            ));
        }
        if self.min_samples_leaf.low == 0 {
            return Err(PricerError::ConfigError(
                "min_samples_leaf must start at 1 or more".to_string(),
            ));
        }
        if self.max_features.is_empty() {
            return Err(PricerError::ConfigError(
                "max_features needs at least one choice".to_string(),
            ));
        }
        Ok(())
    }
}

/// Randomized search budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of sampled candidates
    pub n_iter: usize,
    /// Folds used to score each candidate
    pub cv_folds: usize,
    pub space: SearchSpace,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iter: 20,
            cv_folds: 3,
            space: SearchSpace::default(),
        }
    }
}

/// Configuration of an offline training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// CSV with historical listings
    pub data_path: PathBuf,
    /// Where the fitted pipeline is written
    pub output_path: PathBuf,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed for the split, the search and the forests
    pub random_state: u64,
    /// Listings priced at or above this are dropped before training
    pub price_ceiling: f64,
    pub search: SearchConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/raw/pakwheels.csv"),
            output_path: PathBuf::from("artifacts/car_price_model.bin"),
            test_size: 0.2,
            random_state: 42,
            price_ceiling: 40_000_000.0,
            search: SearchConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; absent keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.search.n_iter = n_iter;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.search.cv_folds = folds;
        self
    }

    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.search.space = space;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PricerError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.price_ceiling <= 0.0 {
            return Err(PricerError::ConfigError(
                "price_ceiling must be positive".to_string(),
            ));
        }
        if self.search.n_iter == 0 {
            return Err(PricerError::ConfigError("n_iter must be at least 1".to_string()));
        }
        if self.search.cv_folds < 2 {
            return Err(PricerError::ConfigError("cv_folds must be at least 2".to_string()));
        }
        self.search.space.validate()
    }
}
