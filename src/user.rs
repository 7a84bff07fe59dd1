//! Code for creating the user table and resolving the acting user.
//!
//! Every row the import pipeline writes is owned by a user, and every
//! query filters on the owner. This stands in for the hosted backend's
//! row-level access policy.

use std::fmt::Display;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user is addressed by on the command line.
    pub name: String,
}

/// Create the user table.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub(crate) fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
/// Returns [Error::DuplicateUsername] if `name` is already taken, or an
/// [Error::SqlError] if an SQL related error occurred.
pub fn create_user(name: &str, connection: &Connection) -> Result<User, Error> {
    connection.execute("INSERT INTO user (name) VALUES (?1)", (name,))?;

    let id = connection.last_insert_rowid();

    Ok(User {
        id: UserID::new(id),
        name: name.to_owned(),
    })
}

/// Retrieve the user with `name` from the database.
///
/// # Errors
/// Returns [Error::NotFound] if no user has `name`, or an
/// [Error::SqlError] if an SQL related error occurred.
pub fn get_user_by_name(name: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name FROM user WHERE name = :name")?
        .query_row(&[(":name", name)], |row| {
            Ok(User {
                id: UserID::new(row.get(0)?),
                name: row.get(1)?,
            })
        })
        .map_err(|error| error.into())
}

/// Resolve the user that owns the current operation.
///
/// When `name` is given, that user is looked up. Otherwise the database's
/// sole user is used, mirroring a single-owner ledger. Both paths fail
/// with [Error::NotAuthenticated] when no user can be resolved, so no
/// operation ever runs without an owner.
pub fn current_user(name: Option<&str>, connection: &Connection) -> Result<User, Error> {
    if let Some(name) = name {
        return get_user_by_name(name, connection).map_err(|error| match error {
            Error::NotFound => Error::NotAuthenticated,
            error => error,
        });
    }

    let mut users = connection
        .prepare("SELECT id, name FROM user LIMIT 2")?
        .query_map([], |row| {
            Ok(User {
                id: UserID::new(row.get(0)?),
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    match users.len() {
        1 => Ok(users.remove(0)),
        0 => Err(Error::NotAuthenticated),
        _ => {
            tracing::debug!("Multiple users exist, refusing to guess the acting user");
            Err(Error::NotAuthenticated)
        }
    }
}

/// Check that `user_id` refers to a user in the database.
///
/// # Errors
/// Returns [Error::NotAuthenticated] if the user does not exist, or an
/// [Error::SqlError] if an SQL related error occurred.
pub(crate) fn ensure_user_exists(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let id: Option<i64> = connection
        .prepare("SELECT id FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], |row| row.get(0))
        .optional()?;

    match id {
        Some(_) => Ok(()),
        None => Err(Error::NotAuthenticated),
    }
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::{UserID, create_user, current_user, ensure_user_exists, get_user_by_name};

    fn get_test_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&connection).expect("Could not initialise database");
        connection
    }

    #[test]
    fn create_and_get_user() {
        let connection = get_test_connection();

        let created = create_user("alice", &connection).expect("Could not create user");
        let fetched = get_user_by_name("alice", &connection).expect("Could not fetch user");

        assert_eq!(created, fetched);
    }

    #[test]
    fn create_user_rejects_duplicate_name() {
        let connection = get_test_connection();
        create_user("alice", &connection).expect("Could not create user");

        let duplicate = create_user("alice", &connection);

        assert_eq!(duplicate, Err(Error::DuplicateUsername));
    }

    #[test]
    fn get_user_fails_on_unknown_name() {
        let connection = get_test_connection();

        let maybe_user = get_user_by_name("nobody", &connection);

        assert_eq!(maybe_user, Err(Error::NotFound));
    }

    #[test]
    fn current_user_by_name() {
        let connection = get_test_connection();
        create_user("alice", &connection).expect("Could not create user");
        let want = create_user("bob", &connection).expect("Could not create user");

        let got = current_user(Some("bob"), &connection).expect("Could not resolve user");

        assert_eq!(want, got);
    }

    #[test]
    fn current_user_defaults_to_sole_user() {
        let connection = get_test_connection();
        let want = create_user("alice", &connection).expect("Could not create user");

        let got = current_user(None, &connection).expect("Could not resolve user");

        assert_eq!(want, got);
    }

    #[test]
    fn current_user_fails_with_no_users() {
        let connection = get_test_connection();

        assert_eq!(current_user(None, &connection), Err(Error::NotAuthenticated));
    }

    #[test]
    fn current_user_refuses_to_guess_between_users() {
        let connection = get_test_connection();
        create_user("alice", &connection).expect("Could not create user");
        create_user("bob", &connection).expect("Could not create user");

        assert_eq!(current_user(None, &connection), Err(Error::NotAuthenticated));
    }

    #[test]
    fn current_user_fails_on_unknown_name() {
        let connection = get_test_connection();
        create_user("alice", &connection).expect("Could not create user");

        assert_eq!(
            current_user(Some("mallory"), &connection),
            Err(Error::NotAuthenticated)
        );
    }

    #[test]
    fn ensure_user_exists_rejects_unknown_id() {
        let connection = get_test_connection();
        let user = create_user("alice", &connection).expect("Could not create user");

        assert_eq!(ensure_user_exists(user.id, &connection), Ok(()));
        assert_eq!(
            ensure_user_exists(UserID::new(user.id.as_i64() + 42), &connection),
            Err(Error::NotAuthenticated)
        );
    }
}
