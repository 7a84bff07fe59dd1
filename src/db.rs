//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{Error, import, user};

/// Create the application's database tables if they do not exist yet.
///
/// The tables are created inside a single exclusive transaction so a
/// half-created schema is never left behind.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    user::create_user_table(&transaction)?;
    import::create_import_session_table(&transaction)?;
    import::create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_creates_schema() {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");

        initialize(&connection).expect("Could not initialise database");

        let table_count: usize = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('user', 'import_session', 'transaction')",
                [],
                |row| row.get::<_, i64>(0).map(|count| count as usize),
            )
            .expect("Could not count tables");

        assert_eq!(table_count, 3, "want 3 tables, got {table_count}");
    }

    #[test]
    fn initialize_is_idempotent() {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");

        initialize(&connection).expect("Could not initialise database");
        initialize(&connection).expect("Could not initialise database a second time");
    }
}
