//! CSV loading into raw listing records

use crate::error::{PricerError, Result};
use crate::preprocessing::RawRecord;
use polars::prelude::*;
use serde_json::Value;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Data loader for CSV listings
pub struct DataLoader {
    /// Field separator
    delimiter: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Set the field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a CSV file with every column read as text.
    ///
    /// Typing is left to the feature preparer so that training and serving
    /// coerce values the same way. Empty cells load as nulls.
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PricerError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| PricerError::DataError(format!("cannot read {}: {}", path.display(), e)))
    }

    /// Load a CSV file as raw records, one per row
    pub fn load_records(&self, path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
        let start = Instant::now();
        let df = self.load_csv(path.as_ref())?;
        let records = records_from_dataframe(&df)?;

        info!(
            path = %path.as_ref().display(),
            rows = records.len(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );

        Ok(records)
    }
}

/// Convert a text-typed frame into raw records. Nulls are kept as JSON
/// `null` so the column still counts as present.
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<RawRecord>> {
    let mut records: Vec<RawRecord> = (0..df.height()).map(|_| RawRecord::new()).collect();

    for column in df.get_columns() {
        let name = column.name().to_string();
        let values = column.str()?;

        for (record, value) in records.iter_mut().zip(values.into_iter()) {
            let value = match value {
                Some(text) => Value::String(text.to_string()),
                None => Value::Null,
            };
            record.insert(name.clone(), value);
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_records_as_text() {
        let file = write_csv(
            "price,model,mileage,city\n1500000,2015,80000,Lahore\n2300000,2019,,Karachi\n",
        );
        let records = DataLoader::new().load_records(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["price"], "1500000");
        assert_eq!(records[0]["city"], "Lahore");
        assert_eq!(records[1]["mileage"], Value::Null);
        assert!(records[1].contains_key("mileage"));
    }

    #[test]
    fn test_custom_delimiter() {
        let file = write_csv("model;city\n2010;Multan\n");
        let records = DataLoader::new()
            .with_delimiter(b';')
            .load_records(file.path())
            .unwrap();
        assert_eq!(records[0]["model"], "2010");
        assert_eq!(records[0]["city"], "Multan");
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::new().load_records("/nonexistent/listings.csv").unwrap_err();
        assert!(matches!(err, PricerError::DataError(_)));
    }
}
