//! Feature preparation shared by training and serving
//!
//! Both paths go through the same two steps so the model always sees the
//! same columns, cleaned the same way:
//! - [`prepare`] turns raw listing records into a typed [`CleanedTable`]
//! - [`select`] projects that table onto the fixed model columns
//!
//! The fitted side of the contract lives here too: the one-hot
//! [`FeatureEncoder`] and the `log1p` target transform.

mod cleaner;
mod selector;
mod encoder;
pub mod target;

pub use cleaner::{prepare, CleanedRecord, CleanedTable, PreparedBatch};
pub(crate) use cleaner::coerce_numeric;
pub use selector::{select, FeatureRow, FeatureTable};
pub use encoder::FeatureEncoder;

/// A listing as received from a CSV row or a JSON request body
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Year that listing ages are measured against
pub const REFERENCE_YEAR: f64 = 2025.0;

/// Placeholder category for missing categorical values
pub const UNKNOWN_CATEGORY: &str = "Unknown";

pub const PRICE_COLUMN: &str = "price";
pub const MODEL_YEAR_COLUMN: &str = "model";
pub const AGE_COLUMN: &str = "age";
pub const MILEAGE_COLUMN: &str = "mileage";

/// Categorical fields the preparer fills with [`UNKNOWN_CATEGORY`]
pub const CATEGORICAL_COLUMNS: [&str; 6] = [
    "fuel_type",
    "transmission",
    "city",
    "registered",
    "assembly",
    "color",
];

/// Model input columns, in order
pub const FEATURE_COLUMNS: [&str; 7] = [
    AGE_COLUMN,
    MILEAGE_COLUMN,
    "fuel_type",
    "transmission",
    "city",
    "registered",
    "assembly",
];

/// Numeric model inputs, passed through unscaled
pub const NUMERIC_FEATURES: [&str; 2] = [AGE_COLUMN, MILEAGE_COLUMN];

/// Categorical model inputs, one-hot encoded
pub const CATEGORICAL_FEATURES: [&str; 5] = [
    "fuel_type",
    "transmission",
    "city",
    "registered",
    "assembly",
];
