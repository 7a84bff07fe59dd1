//! Persists a reviewed batch of transactions as an import session.

use rusqlite::Connection;
use serde::Serialize;
use time::{Date, Month};

use crate::{
    Error, UserID,
    csv_import::ParsedTransaction,
    import::{
        db,
        models::{ImportStatus, SessionId},
    },
    user,
};

/// The result of a successful import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    /// The ID of the import session that groups the stored transactions.
    pub session_id: SessionId,
    /// How many rows the batch contained, valid and invalid.
    pub transaction_count: usize,
    /// How many rows passed validation and were stored.
    pub valid_transaction_count: usize,
}

impl ImportOutcome {
    /// A human-readable summary of the import.
    pub fn message(&self) -> String {
        format!(
            "{} valid transactions imported out of {} total",
            self.valid_transaction_count, self.transaction_count
        )
    }
}

/// Persist the valid transactions of a reviewed batch under a new import
/// session for the month `month` (`YYYY-MM`).
///
/// The session row and its transactions are written in a single database
/// transaction, so a partial batch is never committed. If the write
/// fails, a session with [ImportStatus::Failed] and the batch's counts is
/// recorded instead so the failure shows up in the import history, and
/// the original error is returned.
///
/// # Errors
/// This function will return a:
/// - [Error::NotAuthenticated] if `user_id` does not refer to a user,
/// - [Error::InvalidMonth] if `month` is not a real `YYYY-MM` month,
/// - [Error::NoValidTransactions] if no transaction in the batch is valid,
/// - or [Error::SqlError] if there is an SQL error.
pub fn save_transactions(
    transactions: &[ParsedTransaction],
    month: &str,
    user_id: UserID,
    connection: &Connection,
) -> Result<ImportOutcome, Error> {
    user::ensure_user_exists(user_id, connection)?;
    let month = parse_month(month)?;

    let valid: Vec<&ParsedTransaction> = transactions
        .iter()
        .filter(|transaction| transaction.is_valid())
        .collect();

    if valid.is_empty() {
        return Err(Error::NoValidTransactions);
    }

    match save_batch(&valid, transactions.len(), month, user_id, connection) {
        Ok(session_id) => {
            tracing::info!(
                "Imported {} of {} transactions as session {session_id}",
                valid.len(),
                transactions.len()
            );

            Ok(ImportOutcome {
                session_id,
                transaction_count: transactions.len(),
                valid_transaction_count: valid.len(),
            })
        }
        Err(error) => {
            tracing::error!("Failed to import transactions: {error}");

            // Record the failure in the import history. Best-effort: the
            // original error is what the caller needs to see.
            if let Err(record_error) = db::insert_session(
                user_id,
                month,
                transactions.len(),
                valid.len(),
                ImportStatus::Failed,
                connection,
            ) {
                tracing::error!("Could not record the failed import session: {record_error}");
            }

            Err(error)
        }
    }
}

/// Write the session row and its transactions atomically.
fn save_batch(
    valid: &[&ParsedTransaction],
    transaction_count: usize,
    month: Date,
    user_id: UserID,
    connection: &Connection,
) -> Result<SessionId, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let session_id = db::insert_session(
        user_id,
        month,
        transaction_count,
        valid.len(),
        ImportStatus::Completed,
        &sql_transaction,
    )?;
    db::insert_session_transactions(session_id, user_id, valid, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(session_id)
}

/// Parses a `YYYY-MM` month string into the first day of that month.
fn parse_month(month: &str) -> Result<Date, Error> {
    let invalid = || Error::InvalidMonth(month.to_owned());

    let (year, month_number) = month.split_once('-').ok_or_else(invalid)?;

    if year.len() != 4 || month_number.len() != 2 {
        return Err(invalid());
    }

    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month_number: u8 = month_number.parse().map_err(|_| invalid())?;
    let month_name = Month::try_from(month_number).map_err(|_| invalid())?;

    Date::from_calendar_date(year, month_name, 1).map_err(|_| invalid())
}
