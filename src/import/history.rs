//! Lists past import sessions and their stored transactions.

use std::str::FromStr;

use rusqlite::Connection;

use crate::{
    Error, UserID,
    import::{
        db,
        models::{ImportSession, ImportStatus, SessionId, StoredTransaction},
    },
};

/// Which import sessions to show in the history listing.
///
/// Filtering happens in the presentation layer after the query, matching
/// how the history view narrows an already-loaded list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// Show every session.
    All,
    /// Show only sessions that were persisted in full.
    Completed,
    /// Show only sessions whose batch failed to persist.
    Failed,
}

impl StatusFilter {
    /// Whether a session with `status` passes the filter.
    pub fn matches(&self, status: ImportStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => status == ImportStatus::Completed,
            StatusFilter::Failed => status == ImportStatus::Failed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "failed" => Ok(StatusFilter::Failed),
            other => Err(format!(
                "\"{other}\" is not a status filter, expected all, completed, or failed"
            )),
        }
    }
}

/// Retrieve every import session owned by `user_id`, most recent first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn list_import_sessions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<ImportSession>, Error> {
    db::list_sessions(user_id, connection)
}

/// Narrow a session listing to the sessions matching `filter`.
pub fn filter_sessions(sessions: Vec<ImportSession>, filter: StatusFilter) -> Vec<ImportSession> {
    sessions
        .into_iter()
        .filter(|session| filter.matches(session.status))
        .collect()
}

/// Retrieve the transactions stored by the import session `session_id`,
/// newest date first.
///
/// # Errors
/// This function will return an [Error::NotFound] if the session does not
/// exist or belongs to another user, or an [Error::SqlError] if there is
/// some other SQL error.
pub fn list_session_transactions(
    session_id: SessionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<StoredTransaction>, Error> {
    db::get_session(session_id, user_id, connection)?;

    db::list_transactions(session_id, user_id, connection)
}

#[cfg(test)]
mod history_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, User,
        csv_import::{RawRecord, validate_record},
        db::initialize,
        import::{models::ImportStatus, save::save_transactions},
        user::create_user,
    };

    use super::{
        StatusFilter, filter_sessions, list_import_sessions, list_session_transactions,
    };

    fn get_test_connection_and_user() -> (Connection, User) {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&connection).expect("Could not initialise database");
        let user = create_user("alice", &connection).expect("Could not create user");

        (connection, user)
    }

    fn import_one(description: &str, date: &str, user: &User, connection: &Connection) -> i64 {
        let record: RawRecord = [
            ("Description", description),
            ("Amount", "-5.00"),
            ("Completed Date", date),
        ]
        .into_iter()
        .collect();

        save_transactions(&[validate_record(&record)], "2024-06", user.id, connection)
            .expect("Could not save transactions")
            .session_id
    }

    #[test]
    fn lists_sessions_most_recent_first() {
        let (connection, user) = get_test_connection_and_user();
        let first = import_one("Coffee", "01/06/2024", &user, &connection);
        let second = import_one("Lunch", "02/06/2024", &user, &connection);
        let third = import_one("Dinner", "03/06/2024", &user, &connection);

        let sessions =
            list_import_sessions(user.id, &connection).expect("Could not list sessions");

        let ids: Vec<i64> = sessions.iter().map(|session| session.id).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn listing_is_scoped_to_the_user() {
        let (connection, alice) = get_test_connection_and_user();
        let bob = create_user("bob", &connection).expect("Could not create user");
        import_one("Coffee", "01/06/2024", &alice, &connection);

        let sessions = list_import_sessions(bob.id, &connection).expect("Could not list sessions");

        assert!(
            sessions.is_empty(),
            "want no sessions for another user, got {sessions:?}"
        );
    }

    #[test]
    fn filters_sessions_by_status() {
        let (connection, user) = get_test_connection_and_user();
        import_one("Coffee", "01/06/2024", &user, &connection);

        // Force a failure record alongside the completed session.
        connection
            .execute("DROP TABLE \"transaction\"", ())
            .expect("Could not drop transaction table");
        let record: RawRecord = [
            ("Description", "Lunch"),
            ("Amount", "-11.20"),
            ("Completed Date", "02/06/2024"),
        ]
        .into_iter()
        .collect();
        let failed = save_transactions(
            &[validate_record(&record)],
            "2024-06",
            user.id,
            &connection,
        );
        assert!(matches!(failed, Err(Error::SqlError(_))));

        let sessions =
            list_import_sessions(user.id, &connection).expect("Could not list sessions");
        assert_eq!(sessions.len(), 2, "want 2 sessions, got {}", sessions.len());

        let completed = filter_sessions(sessions.clone(), StatusFilter::Completed);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].status, ImportStatus::Completed);

        let failed = filter_sessions(sessions.clone(), StatusFilter::Failed);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].status, ImportStatus::Failed);

        let all = filter_sessions(sessions, StatusFilter::All);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn status_filter_parses_from_str() {
        assert_eq!("all".parse(), Ok(StatusFilter::All));
        assert_eq!("completed".parse(), Ok(StatusFilter::Completed));
        assert_eq!("failed".parse(), Ok(StatusFilter::Failed));
        assert!("pending".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn lists_session_transactions_newest_date_first() {
        let (connection, user) = get_test_connection_and_user();
        let batch: Vec<_> = [
            ("Coffee", "01/06/2024"),
            ("Dinner", "03/06/2024"),
            ("Lunch", "02/06/2024"),
        ]
        .into_iter()
        .map(|(description, date)| {
            let record: RawRecord = [
                ("Description", description),
                ("Amount", "-5.00"),
                ("Completed Date", date),
            ]
            .into_iter()
            .collect();

            validate_record(&record)
        })
        .collect();
        let session_id = save_transactions(&batch, "2024-06", user.id, &connection)
            .expect("Could not save transactions")
            .session_id;

        let transactions = list_session_transactions(session_id, user.id, &connection)
            .expect("Could not list stored transactions");

        let dates: Vec<_> = transactions
            .iter()
            .map(|transaction| transaction.date)
            .collect();
        assert_eq!(
            dates,
            vec![
                date!(2024 - 06 - 03),
                date!(2024 - 06 - 02),
                date!(2024 - 06 - 01)
            ]
        );
    }

    #[test]
    fn listing_transactions_of_missing_session_fails() {
        let (connection, user) = get_test_connection_and_user();

        let result = list_session_transactions(999, user.id, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }
}
