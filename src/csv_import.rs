//! Parsing and validation of bank statement CSV exports.
//!
//! This module turns a CSV file into a reviewed batch of transactions:
//! - [parse_csv]/[read_csv_file] read the file into header-keyed
//!   [RawRecord]s,
//! - [validate_record] normalises a single record into a
//!   [ParsedTransaction], collecting validation failures instead of
//!   erroring,
//! - [normalize_batch] applies the validator across the whole file.

mod csv;
mod validate;

pub use csv::{MAX_IMPORT_FILE_BYTES, RawRecord, parse_csv, read_csv_file};
pub use validate::{
    CATEGORIES, DEFAULT_CATEGORY, ParsedTransaction, TransactionKind, ValidationFailure,
    normalize_batch, validate_record,
};
