//! The models for import sessions and the transactions they store.

use std::fmt::Display;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{DatabaseID, TransactionKind, UserID};

/// Alias for the integer type used for import session IDs.
pub type SessionId = DatabaseID;

/// The outcome of an import session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// The batch was persisted in full.
    Completed,
    /// Persisting the batch failed and no transactions were stored.
    Failed,
}

impl ImportStatus {
    /// The status as it is stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
        }
    }
}

impl Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for ImportStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for ImportStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "completed" => Ok(ImportStatus::Completed),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(FromSqlError::Other(
                format!("\"{other}\" is not an import status").into(),
            )),
        }
    }
}

/// A record grouping one CSV import batch, its counts, and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSession {
    /// The ID of the import session.
    pub id: SessionId,
    /// The ID of the user that ran the import.
    pub user_id: UserID,
    /// The budget month the batch was imported into, held as the first
    /// day of that month.
    pub month: Date,
    /// How many rows the batch contained, valid and invalid.
    pub transaction_count: usize,
    /// How many of the batch's rows passed validation. Never exceeds
    /// [transaction_count](Self::transaction_count).
    pub valid_transaction_count: usize,
    /// Whether the batch was persisted or failed.
    pub status: ImportStatus,
    /// When the import ran.
    pub created_at: OffsetDateTime,
}

/// A transaction persisted by an import session.
///
/// Stored transactions are immutable: editing happens on the parsed batch
/// before it is saved, and reversal removes the whole session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredTransaction {
    /// The ID of the transaction.
    pub id: DatabaseID,
    /// The ID of the user that owns the transaction.
    pub user_id: UserID,
    /// The import session that created the transaction.
    pub import_session_id: SessionId,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// The category the transaction is filed under.
    pub category: String,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// Whether the source row passed validation. Always true: invalid
    /// rows are never persisted.
    pub is_valid: bool,
    /// The reason the source row failed validation, if it did.
    pub invalid_reason: Option<String>,
    /// The description exactly as it was read from the source row.
    pub original_description: String,
    /// When the transaction was persisted.
    pub created_at: OffsetDateTime,
}
