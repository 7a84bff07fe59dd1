//! Database functions for import sessions and their transactions.

use rusqlite::{Connection, Row};
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    csv_import::ParsedTransaction,
    import::models::{ImportSession, ImportStatus, SessionId, StoredTransaction},
};

/// Create the import session table.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub(crate) fn create_import_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS import_session (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                month TEXT NOT NULL,
                transaction_count INTEGER NOT NULL,
                valid_transaction_count INTEGER NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create the transaction table.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub(crate) fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                import_session_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                type TEXT NOT NULL,
                is_valid INTEGER NOT NULL,
                invalid_reason TEXT,
                original_description TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(import_session_id) REFERENCES import_session(id)
                )",
        (),
    )?;

    Ok(())
}

/// Insert an import session row and return its ID.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(super) fn insert_session(
    user_id: UserID,
    month: Date,
    transaction_count: usize,
    valid_transaction_count: usize,
    status: ImportStatus,
    connection: &Connection,
) -> Result<SessionId, Error> {
    connection.execute(
        "INSERT INTO import_session
            (user_id, month, transaction_count, valid_transaction_count, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            user_id.as_i64(),
            month,
            transaction_count as i64,
            valid_transaction_count as i64,
            status,
            OffsetDateTime::now_utc(),
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Insert the valid transactions of a batch, stamped with the session ID.
///
/// Invalid transactions are skipped: they are kept for review only and
/// must never reach the ledger.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(super) fn insert_session_transactions(
    session_id: SessionId,
    user_id: UserID,
    transactions: &[&ParsedTransaction],
    connection: &Connection,
) -> Result<usize, Error> {
    let mut statement = connection.prepare(
        "INSERT INTO \"transaction\"
            (user_id, import_session_id, date, description, amount, category, type,
             is_valid, invalid_reason, original_description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;

    let created_at = OffsetDateTime::now_utc();
    let mut inserted = 0;

    for transaction in transactions {
        let (Some(date), Some(amount)) = (transaction.date, transaction.amount) else {
            continue;
        };

        statement.execute((
            user_id.as_i64(),
            session_id,
            date,
            &transaction.description,
            amount,
            &transaction.category,
            transaction.kind,
            transaction.is_valid(),
            transaction.invalid_reason(),
            &transaction.original_description,
            created_at,
        ))?;

        inserted += 1;
    }

    Ok(inserted)
}

/// Retrieve the import session with `session_id` owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::NotFound] if the session does not
/// exist or belongs to another user, or an [Error::SqlError] if there is
/// some other SQL error.
pub(super) fn get_session(
    session_id: SessionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<ImportSession, Error> {
    connection
        .prepare(
            "SELECT id, user_id, month, transaction_count, valid_transaction_count, status, created_at
             FROM import_session
             WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &session_id), (":user_id", &user_id.as_i64())],
            map_session_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve every import session owned by `user_id`, most recent first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(super) fn list_sessions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<ImportSession>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, month, transaction_count, valid_transaction_count, status, created_at
             FROM import_session
             WHERE user_id = :user_id
             ORDER BY created_at DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_session_row)?
        .map(|maybe_session| maybe_session.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the transactions stored by one import session, newest date
/// first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(super) fn list_transactions(
    session_id: SessionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<StoredTransaction>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, import_session_id, date, description, amount, category, type,
                    is_valid, invalid_reason, original_description, created_at
             FROM \"transaction\"
             WHERE import_session_id = :session_id AND user_id = :user_id
             ORDER BY date DESC, id DESC",
        )?
        .query_map(
            &[(":session_id", &session_id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Delete the transactions created by one import session.
///
/// Returns the number of transactions removed.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(super) fn delete_session_transactions(
    session_id: SessionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<usize, Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE import_session_id = ?1 AND user_id = ?2",
        (session_id, user_id.as_i64()),
    )?;

    Ok(rows_affected)
}

/// Delete an import session row.
///
/// Returns the number of rows removed, which is zero when the session
/// does not exist or belongs to another user.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(super) fn delete_session(
    session_id: SessionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<usize, Error> {
    let rows_affected = connection.execute(
        "DELETE FROM import_session WHERE id = ?1 AND user_id = ?2",
        (session_id, user_id.as_i64()),
    )?;

    Ok(rows_affected)
}

/// Count the transactions stored under one import session.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(super) fn count_session_transactions(
    session_id: SessionId,
    connection: &Connection,
) -> Result<usize, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE import_session_id = ?1",
            [session_id],
            |row| row.get::<_, i64>(0).map(|count| count as usize),
        )
        .map_err(|error| error.into())
}

fn map_session_row(row: &Row) -> Result<ImportSession, rusqlite::Error> {
    Ok(ImportSession {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        month: row.get(2)?,
        transaction_count: row.get::<_, i64>(3)? as usize,
        valid_transaction_count: row.get::<_, i64>(4)? as usize,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_transaction_row(row: &Row) -> Result<StoredTransaction, rusqlite::Error> {
    Ok(StoredTransaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        import_session_id: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        amount: row.get(5)?,
        category: row.get(6)?,
        kind: row.get(7)?,
        is_valid: row.get(8)?,
        invalid_reason: row.get(9)?,
        original_description: row.get(10)?,
        created_at: row.get(11)?,
    })
}
