//! Projection of cleaned records onto the model's input columns

use super::{
    CleanedTable, CATEGORICAL_FEATURES, FEATURE_COLUMNS, NUMERIC_FEATURES, PRICE_COLUMN,
};
use crate::error::{PricerError, Result};
use serde::{Deserialize, Serialize};

/// One model input row: `age, mileage` then the five categoricals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Values for [`NUMERIC_FEATURES`], in order
    pub numeric: [f64; 2],
    /// Values for [`CATEGORICAL_FEATURES`], in order
    pub categorical: [String; 5],
}

impl FeatureRow {
    pub fn age(&self) -> f64 {
        self.numeric[0]
    }

    pub fn mileage(&self) -> f64 {
        self.numeric[1]
    }
}

/// Ordered feature rows ready for encoding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows at the given positions, in the given order
    pub fn take(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// Project a cleaned table onto [`FEATURE_COLUMNS`].
///
/// Fails with [`PricerError::MissingColumns`] naming every required column
/// the table lacks. The `price` column is returned untouched as the second
/// element when the table has one.
pub fn select(table: &CleanedTable) -> Result<(FeatureTable, Option<Vec<f64>>)> {
    let missing: Vec<String> = FEATURE_COLUMNS
        .iter()
        .filter(|col| !table.has_column(col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PricerError::MissingColumns(missing));
    }

    let mut rows = Vec::with_capacity(table.len());
    for record in table.records() {
        let mut numeric = [0.0; 2];
        for (slot, col) in numeric.iter_mut().zip(NUMERIC_FEATURES) {
            *slot = record.numeric(col).ok_or_else(|| {
                PricerError::ValidationError(format!("row {} has no value for {}", record.row, col))
            })?;
        }

        let categorical = CATEGORICAL_FEATURES.map(|col| {
            record.category(col).unwrap_or(super::UNKNOWN_CATEGORY).to_string()
        });

        rows.push(FeatureRow { numeric, categorical });
    }

    let target = if table.has_column(PRICE_COLUMN) {
        Some(
            table
                .records()
                .iter()
                .map(|r| r.price.unwrap_or(f64::NAN))
                .collect(),
        )
    } else {
        None
    };

    Ok((FeatureTable::new(rows), target))
}
