//! Prediction request bodies

use crate::error::{PricerError, Result};
use crate::preprocessing::RawRecord;
use serde_json::Value;

/// The three body shapes `/predict` accepts
#[derive(Debug, Clone, PartialEq)]
pub enum PredictPayload {
    /// `{"model": 2019, ...}`
    Single(RawRecord),
    /// `[{...}, {...}]`
    Records(Vec<RawRecord>),
    /// `{"rows": [{...}, {...}]}`
    Wrapped(Vec<RawRecord>),
}

impl PredictPayload {
    /// Parse a raw request body. Anything that is not one of the three shapes
    /// is [`PricerError::InvalidPayload`].
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|_| PricerError::InvalidPayload)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) if !items.is_empty() => {
                Ok(PredictPayload::Records(into_objects(items)?))
            }
            Value::Object(mut map) if !map.is_empty() => match map.remove("rows") {
                Some(Value::Array(items)) => Ok(PredictPayload::Wrapped(into_objects(items)?)),
                Some(_) => Err(PricerError::InvalidPayload),
                None => Ok(PredictPayload::Single(map)),
            },
            _ => Err(PricerError::InvalidPayload),
        }
    }

    /// Normalize to a record sequence
    pub fn into_records(self) -> Vec<RawRecord> {
        match self {
            PredictPayload::Single(record) => vec![record],
            PredictPayload::Records(records) | PredictPayload::Wrapped(records) => records,
        }
    }
}

fn into_objects(items: Vec<Value>) -> Result<Vec<RawRecord>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(PricerError::InvalidPayload),
        })
        .collect()
}
