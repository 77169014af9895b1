//! Car price predictor - used-car prices for PakWheels listings
//!
//! This crate provides:
//! - Feature preparation shared by training and serving
//! - An offline training job (one-hot encoding + random forest on `log1p(price)`,
//!   tuned by randomized search with k-fold cross-validation)
//! - An inference procedure that maps listings to non-negative prices
//! - An HTTP prediction service and a CLI
//!
//! # Modules
//!
//! - [`preprocessing`] - Feature preparer, selector, encoder, target transform
//! - [`training`] - Decision trees, random forest, search and the training job
//! - [`inference`] - Persisted pipeline, request payloads, inference procedure
//! - [`utils`] - CSV loading
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod inference;

// Utilities
pub mod utils;

// Services
pub mod server;
pub mod cli;

pub use error::{PricerError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PricerError, Result, RejectReason, RowRejection};

    // Preprocessing
    pub use crate::preprocessing::{
        prepare, select, CleanedTable, FeatureEncoder, FeatureTable, RawRecord, FEATURE_COLUMNS,
    };

    // Training
    pub use crate::training::{ForestParams, RandomForest, TrainEngine, TrainingConfig, TrainingReport};

    // Inference
    pub use crate::inference::{
        predict_prices, InferenceEngine, PredictPayload, PredictionOutput, PriceModel, PricePipeline,
    };

    // Serving
    pub use crate::server::{create_router, AppState, ServerConfig};
}
