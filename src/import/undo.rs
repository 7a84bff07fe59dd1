//! Reverses an import session.

use rusqlite::Connection;

use crate::{
    Error, UserID,
    import::{db, models::SessionId},
};

/// Delete the import session with `session_id` and every transaction it
/// created, reversing the import.
///
/// The transactions are removed first and the session row second, so a
/// dangling reference to a deleted session can never be left behind. If
/// the second delete fails, the session row survives with its
/// transactions already gone; the error is surfaced and the caller may
/// retry the undo.
///
/// # Errors
/// This function will return an [Error::NotFound] if the session does not
/// exist or belongs to another user (undoing the same session twice fails
/// this way and removes nothing), or an [Error::SqlError] if a delete
/// fails.
pub fn undo_import(
    session_id: SessionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    db::get_session(session_id, user_id, connection)?;

    let removed = db::delete_session_transactions(session_id, user_id, connection)?;
    tracing::debug!("Removed {removed} transactions for import session {session_id}");

    let rows_affected = db::delete_session(session_id, user_id, connection)?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::info!("Undid import session {session_id}");

    Ok(())
}
