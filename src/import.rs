//! Import session management for the ledger.
//!
//! Persisting a reviewed batch creates an import session that groups the
//! stored transactions, records the batch's counts and outcome, and can
//! later be listed, inspected, or undone as a unit.

mod db;
mod history;
mod models;
mod save;
mod undo;

pub(crate) use db::{create_import_session_table, create_transaction_table};
pub use history::{
    StatusFilter, filter_sessions, list_import_sessions, list_session_transactions,
};
pub use models::{ImportSession, ImportStatus, SessionId, StoredTransaction};
pub use save::{ImportOutcome, save_transactions};
pub use undo::undo_import;
