//! Raw record cleaning
//!
//! Column presence is decided per batch: a column exists if any record in
//! the batch carries the key. Rules only apply to columns that exist, and
//! columns that don't exist are never synthesized.

use super::{
    RawRecord, AGE_COLUMN, CATEGORICAL_COLUMNS, MILEAGE_COLUMN, MODEL_YEAR_COLUMN, PRICE_COLUMN,
    REFERENCE_YEAR, UNKNOWN_CATEGORY,
};
use crate::error::{RejectReason, RowRejection};
use serde_json::Value;
use std::collections::BTreeMap;

/// A record that survived cleaning, with typed values
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    /// Position of the source record in the input batch
    pub row: usize,
    pub price: Option<f64>,
    pub model: Option<f64>,
    pub age: Option<f64>,
    pub mileage: Option<f64>,
    /// Categorical values keyed by column, `"Unknown"` where missing
    pub categorical: BTreeMap<&'static str, String>,
}

impl CleanedRecord {
    /// Numeric value of a cleaned column
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            PRICE_COLUMN => self.price,
            MODEL_YEAR_COLUMN => self.model,
            AGE_COLUMN => self.age,
            MILEAGE_COLUMN => self.mileage,
            _ => None,
        }
    }

    /// Categorical value of a cleaned column
    pub fn category(&self, column: &str) -> Option<&str> {
        self.categorical.get(column).map(|s| s.as_str())
    }
}

/// Cleaned records plus the set of columns present after cleaning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedTable {
    columns: Vec<&'static str>,
    records: Vec<CleanedRecord>,
}

impl CleanedTable {
    /// Columns present in the table
    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| *c == name)
    }

    pub fn records(&self) -> &[CleanedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Output of [`prepare`]: the cleaned table and every row that was dropped
#[derive(Debug, Clone, Default)]
pub struct PreparedBatch {
    pub table: CleanedTable,
    pub rejected: Vec<RowRejection>,
}

impl PreparedBatch {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Which known columns appear anywhere in the batch
struct BatchColumns {
    price: bool,
    model: bool,
    age: bool,
    mileage: bool,
    categorical: Vec<&'static str>,
}

impl BatchColumns {
    fn scan(records: &[RawRecord]) -> Self {
        let present = |name: &str| records.iter().any(|r| r.contains_key(name));
        Self {
            price: present(PRICE_COLUMN),
            model: present(MODEL_YEAR_COLUMN),
            age: present(AGE_COLUMN),
            mileage: present(MILEAGE_COLUMN),
            categorical: CATEGORICAL_COLUMNS
                .iter()
                .copied()
                .filter(|c| present(c))
                .collect(),
        }
    }

    fn table_columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::new();
        if self.price {
            columns.push(PRICE_COLUMN);
        }
        if self.model {
            columns.push(MODEL_YEAR_COLUMN);
        }
        if self.mileage {
            columns.push(MILEAGE_COLUMN);
        }
        columns.extend(self.categorical.iter().copied());
        if self.model || self.age {
            columns.push(AGE_COLUMN);
        }
        columns
    }
}

/// Clean a batch of raw records.
///
/// - with a `price` column, rows with a missing, non-numeric or non-positive price are dropped
/// - `model` and `mileage`, when present, must coerce to numbers or the row is dropped
/// - `age` becomes `2025 - model` whenever `model` is present; a supplied `age`
///   is only kept (coerced) when `model` is absent
/// - missing categorical values become `"Unknown"`
///
/// The input is not modified. Dropped rows are reported in
/// [`PreparedBatch::rejected`]; a batch where every row is dropped yields an
/// empty table.
pub fn prepare(records: &[RawRecord]) -> PreparedBatch {
    let columns = BatchColumns::scan(records);
    let mut batch = PreparedBatch {
        table: CleanedTable {
            columns: columns.table_columns(),
            records: Vec::with_capacity(records.len()),
        },
        rejected: Vec::new(),
    };

    for (row, record) in records.iter().enumerate() {
        match clean_record(row, record, &columns) {
            Ok(cleaned) => batch.table.records.push(cleaned),
            Err(rejection) => batch.rejected.push(rejection),
        }
    }

    batch
}

fn clean_record(
    row: usize,
    record: &RawRecord,
    columns: &BatchColumns,
) -> Result<CleanedRecord, RowRejection> {
    let price = if columns.price {
        let price = numeric_field(record, PRICE_COLUMN, row)?;
        if price <= 0.0 {
            return Err(RowRejection {
                row,
                field: PRICE_COLUMN,
                reason: RejectReason::NonPositive(price),
            });
        }
        Some(price)
    } else {
        None
    };

    let model = if columns.model {
        Some(numeric_field(record, MODEL_YEAR_COLUMN, row)?)
    } else {
        None
    };

    let mileage = if columns.mileage {
        Some(numeric_field(record, MILEAGE_COLUMN, row)?)
    } else {
        None
    };

    let age = match model {
        Some(year) => Some(REFERENCE_YEAR - year),
        None if columns.age => Some(numeric_field(record, AGE_COLUMN, row)?),
        None => None,
    };

    let categorical = columns
        .categorical
        .iter()
        .map(|&col| (col, category_value(record.get(col))))
        .collect();

    Ok(CleanedRecord {
        row,
        price,
        model,
        age,
        mileage,
        categorical,
    })
}

fn numeric_field(record: &RawRecord, field: &'static str, row: usize) -> Result<f64, RowRejection> {
    let reject = |reason| RowRejection { row, field, reason };
    match record.get(field) {
        None | Some(Value::Null) => Err(reject(RejectReason::Missing)),
        Some(value) => coerce_numeric(value)
            .ok_or_else(|| reject(RejectReason::NotNumeric(value.to_string()))),
    }
}

/// Coerce a JSON value to a finite float: numbers, or strings holding one
pub(crate) fn coerce_numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn category_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => UNKNOWN_CATEGORY.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
