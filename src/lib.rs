//! Finport imports bank statement CSV exports into a personal finance
//! ledger backed by SQLite.
//!
//! The import pipeline is: parse the CSV into raw records, validate and
//! normalise each record into a transaction, let the caller review the
//! batch, then persist the valid transactions grouped under an import
//! session. Sessions can be listed and reversed after the fact.

#![warn(missing_docs)]

mod csv_import;
mod database_id;
mod db;
mod import;
mod user;

pub use csv_import::{
    CATEGORIES, DEFAULT_CATEGORY, MAX_IMPORT_FILE_BYTES, ParsedTransaction, RawRecord,
    TransactionKind, ValidationFailure, normalize_batch, parse_csv, read_csv_file,
    validate_record,
};
pub use database_id::DatabaseID;
pub use db::initialize;
pub use import::{
    ImportOutcome, ImportSession, ImportStatus, SessionId, StatusFilter, StoredTransaction,
    filter_sessions, list_import_sessions, list_session_transactions, save_transactions,
    undo_import,
};
pub use user::{User, UserID, create_user, current_user, get_user_by_name};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// No acting user could be resolved at persistence time.
    ///
    /// Nothing is read or written on behalf of an unknown user; the caller
    /// should create a user first or name an existing one.
    #[error("no user is available to own the imported data")]
    NotAuthenticated,

    /// The specified user name already exists in the database.
    #[error("the user name already exists in the database")]
    DuplicateUsername,

    /// The month given to an import was not a real `YYYY-MM` month.
    #[error("\"{0}\" is not a valid month, expected the format YYYY-MM")]
    InvalidMonth(String),

    /// Every transaction in the batch failed validation, so there is
    /// nothing to persist.
    #[error("no valid transactions to import")]
    NoValidTransactions,

    /// The CSV had issues that prevented it from being parsed.
    #[error("Could not parse the CSV file: {0}")]
    InvalidCsv(String),

    /// The CSV file could not be read from disk.
    #[error("Could not read the CSV file: {0}")]
    FileUnreadable(String),

    /// The CSV file exceeds the import size cap.
    #[error("the file is {0} bytes which is over the 10MB import limit")]
    FileTooLarge(u64),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows, for
    /// example when undoing an import session that has already been
    /// removed or that belongs to another user.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.name") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
