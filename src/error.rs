//! Error types for the car price predictor

use std::fmt;
use thiserror::Error;

/// Result type alias for predictor operations
pub type Result<T> = std::result::Result<T, PricerError>;

/// Why the feature preparer rejected a row
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// The column exists in the batch but this row has no value for it
    Missing,
    /// The value could not be coerced to a finite number
    NotNumeric(String),
    /// Price must be strictly positive
    NonPositive(f64),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Missing => write!(f, "value is missing"),
            RejectReason::NotNumeric(raw) => write!(f, "value {} is not numeric", raw),
            RejectReason::NonPositive(v) => write!(f, "value {} must be greater than 0", v),
        }
    }
}

/// A row dropped during cleaning, identified by its position in the input batch
#[derive(Debug, Clone, PartialEq)]
pub struct RowRejection {
    pub row: usize,
    pub field: &'static str,
    pub reason: RejectReason,
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {} {}", self.row, self.field, self.reason)
    }
}

/// Main error type for the predictor
#[derive(Error, Debug)]
pub enum PricerError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Model prediction error: {0}")]
    PredictionError(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Missing required fields: {}", format_field_list(.0))]
    MissingColumns(Vec<String>),

    #[error("Invalid input rows: {}", format_rejections(.0))]
    InvalidRows(Vec<RowRejection>),

    #[error("Invalid JSON body")]
    InvalidPayload,

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Render a field list the way the service has always reported it: `['age', 'mileage']`
pub(crate) fn format_field_list(fields: &[String]) -> String {
    let quoted: Vec<String> = fields.iter().map(|f| format!("'{}'", f)).collect();
    format!("[{}]", quoted.join(", "))
}

pub(crate) fn format_rejections(rows: &[RowRejection]) -> String {
    rows.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<polars::error::PolarsError> for PricerError {
    fn from(err: polars::error::PolarsError) -> Self {
        PricerError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PricerError {
    fn from(err: serde_json::Error) -> Self {
        PricerError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for PricerError {
    fn from(err: bincode::Error) -> Self {
        PricerError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PricerError {
    fn from(err: ndarray::ShapeError) -> Self {
        PricerError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
