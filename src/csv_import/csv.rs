//! Reads CSV statement exports into header-keyed records.

use std::{collections::HashMap, fs, path::Path};

use csv::ReaderBuilder;

use crate::Error;

/// The largest CSV file accepted for import, 10MB.
pub const MAX_IMPORT_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// A single row of a parsed CSV file, keyed by column name.
///
/// Raw records carry no guarantees: columns may be missing, blank, or
/// malformed. [validate_record](crate::validate_record) turns a raw
/// record into a normalised transaction.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    /// The raw value of `column`, if the column was present in the CSV.
    ///
    /// The value may be empty or whitespace-only.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// The number of columns that hold a non-blank value.
    pub fn populated_field_count(&self) -> usize {
        self.fields
            .values()
            .filter(|value| !value.trim().is_empty())
            .count()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Parses CSV `text` with a header row into raw records.
///
/// Rows shorter than the header are kept with their trailing columns
/// absent; the batch normaliser decides what to drop. Structural errors
/// such as unbalanced quotes abort the whole batch.
///
/// # Errors
/// Returns [Error::InvalidCsv] if the CSV data could not be parsed.
pub fn parse_csv(text: &str) -> Result<Vec<RawRecord>, Error> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?
        .clone();

    let mut records = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|error| Error::InvalidCsv(error.to_string()))?;

        records.push(headers.iter().zip(record.iter()).collect());
    }

    tracing::debug!("Parsed {} records from CSV data", records.len());

    Ok(records)
}

/// Reads and parses the CSV file at `path`.
///
/// # Errors
/// Returns a:
/// - [Error::FileUnreadable] if the file could not be read,
/// - [Error::FileTooLarge] if the file is over [MAX_IMPORT_FILE_BYTES],
/// - or [Error::InvalidCsv] if the CSV data could not be parsed.
pub fn read_csv_file(path: &Path) -> Result<Vec<RawRecord>, Error> {
    let metadata = fs::metadata(path).map_err(|error| Error::FileUnreadable(error.to_string()))?;

    if metadata.len() > MAX_IMPORT_FILE_BYTES {
        return Err(Error::FileTooLarge(metadata.len()));
    }

    let text = fs::read_to_string(path).map_err(|error| Error::FileUnreadable(error.to_string()))?;

    parse_csv(&text)
}

#[cfg(test)]
mod parse_csv_tests {
    use super::{RawRecord, parse_csv};

    #[test]
    fn parses_records_by_column_name() {
        let csv_data = "Type,Product,Completed Date,Description,Amount\n\
            CARD_PAYMENT,Current,01/06/2024 10:00,Coffee,-4.50\n\
            TOPUP,Current,02/06/2024 09:30,Salary,2500.00";

        let records = parse_csv(csv_data).expect("Could not parse CSV");

        assert_eq!(records.len(), 2, "want 2 records, got {}", records.len());
        assert_eq!(records[0].get("Description"), Some("Coffee"));
        assert_eq!(records[0].get("Amount"), Some("-4.50"));
        assert_eq!(records[1].get("Type"), Some("TOPUP"));
    }

    #[test]
    fn keeps_short_rows() {
        let csv_data = "Description,Amount,Completed Date\n\
            Coffee\n\
            Groceries,-12.00,03/06/2024";

        let records = parse_csv(csv_data).expect("Could not parse CSV");

        assert_eq!(records.len(), 2, "want 2 records, got {}", records.len());
        assert_eq!(records[0].get("Amount"), None);
        assert_eq!(records[0].populated_field_count(), 1);
        assert_eq!(records[1].populated_field_count(), 3);
    }

    #[test]
    fn empty_input_yields_no_records() {
        let records = parse_csv("").expect("Could not parse CSV");

        assert!(records.is_empty(), "want no records, got {records:?}");
    }

    #[test]
    fn skips_blank_lines() {
        let csv_data = "Description,Amount\n\nCoffee,-4.50\n\n";

        let records = parse_csv(csv_data).expect("Could not parse CSV");

        assert_eq!(records.len(), 1, "want 1 record, got {}", records.len());
    }

    #[test]
    fn blank_values_are_not_populated() {
        let record: RawRecord = [("Description", "Coffee"), ("Amount", "  "), ("Type", "")]
            .into_iter()
            .collect();

        assert_eq!(record.populated_field_count(), 1);
        assert_eq!(record.get("Amount"), Some("  "));
    }
}
