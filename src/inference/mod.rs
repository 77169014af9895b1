//! Inference module
//!
//! - [`PricePipeline`]: the persisted encoder + forest artifact
//! - [`PredictPayload`]: the request body shapes
//! - [`predict_prices`] / [`InferenceEngine`]: the prediction procedure

mod engine;
mod payload;
mod pipeline;

pub(crate) use engine::panic_message;
pub use engine::{predict_prices, InferenceEngine, InferenceStats, PredictionOutput};
pub use payload::PredictPayload;
pub use pipeline::{PipelineMetadata, PriceModel, PricePipeline};
