use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use time::{OffsetDateTime, macros::format_description};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use finport::{
    Error, ImportSession, StatusFilter, StoredTransaction, create_user, current_user,
    filter_sessions, initialize, list_import_sessions, list_session_transactions,
    normalize_batch, read_csv_file, save_transactions, undo_import,
};

/// Import bank statement CSV exports into a personal finance ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// File path to the application SQLite database.
    #[arg(long, default_value = "finport.db")]
    db_path: PathBuf,

    /// Name of the acting user. May be omitted when the database has
    /// exactly one user.
    #[arg(long)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and its schema.
    Init,

    /// Add a user that will own imported transactions.
    AddUser {
        /// The name of the new user.
        name: String,
    },

    /// Validate a CSV export and import its transactions.
    Import {
        /// Path to the CSV file exported from the bank.
        file: PathBuf,

        /// Budget month the import belongs to, in YYYY-MM format.
        /// Defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },

    /// List past import sessions, most recent first.
    History {
        /// Only show sessions with this status.
        #[arg(long, default_value = "all")]
        status: StatusFilter,

        /// Print the sessions as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the transactions stored by one import session.
    Show {
        /// The ID of the import session.
        session_id: i64,

        /// Print the transactions as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete an import session and all transactions it created.
    Undo {
        /// The ID of the import session.
        session_id: i64,
    },
}

fn main() {
    setup_logging();

    let cli = Cli::parse();

    if let Err(error) = run(cli) {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn run(cli: Cli) -> Result<(), Error> {
    let connection = Connection::open(&cli.db_path)?;
    initialize(&connection)?;

    match cli.command {
        Command::Init => {
            println!("Initialised database at {}", cli.db_path.display());
        }
        Command::AddUser { name } => {
            let user = create_user(&name, &connection)?;
            println!("Created user \"{}\" with ID {}", user.name, user.id);
        }
        Command::Import { file, month } => {
            let records = read_csv_file(&file)?;
            let batch = normalize_batch(&records);

            for (row_number, transaction) in batch.iter().enumerate() {
                if let Some(reason) = transaction.invalid_reason() {
                    println!(
                        "Skipping row {}: {reason} ({:?})",
                        row_number + 1,
                        transaction.original_description
                    );
                }
            }

            let user = current_user(cli.user.as_deref(), &connection)?;
            let month = month.unwrap_or_else(current_month);
            let outcome = save_transactions(&batch, &month, user.id, &connection)?;

            println!("{}", outcome.message());
            println!("Created import session {}", outcome.session_id);
        }
        Command::History { status, json } => {
            let user = current_user(cli.user.as_deref(), &connection)?;
            let sessions = list_import_sessions(user.id, &connection)?;
            let sessions = filter_sessions(sessions, status);

            if json {
                print_json(&sessions);
            } else {
                print_history(&sessions);
            }
        }
        Command::Show { session_id, json } => {
            let user = current_user(cli.user.as_deref(), &connection)?;
            let transactions = list_session_transactions(session_id, user.id, &connection)?;

            if json {
                print_json(&transactions);
            } else {
                print_transactions(&transactions);
            }
        }
        Command::Undo { session_id } => {
            let user = current_user(cli.user.as_deref(), &connection)?;
            undo_import(session_id, user.id, &connection)?;
            println!("Import session {session_id} has been undone");
        }
    }

    Ok(())
}

/// The current UTC month in the `YYYY-MM` format [save_transactions] expects.
fn current_month() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!("[year]-[month]"))
        .expect("Could not format the current month")
}

fn print_json<T: serde::Serialize>(value: &T) {
    let text = serde_json::to_string_pretty(value).expect("Could not serialize to JSON");
    println!("{text}");
}

fn print_history(sessions: &[ImportSession]) {
    if sessions.is_empty() {
        println!("No import history available");
        return;
    }

    println!(
        "{:<17} {:<15} {:<10} {:>12} {:>6}  Session",
        "Created", "Month", "Status", "Transactions", "Valid"
    );

    for session in sessions {
        let created_at = session
            .created_at
            .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
            .expect("Could not format session timestamp");
        let month = session
            .month
            .format(format_description!("[month repr:long] [year]"))
            .expect("Could not format session month");

        println!(
            "{:<17} {:<15} {:<10} {:>12} {:>6}  {}",
            created_at,
            month,
            session.status,
            session.transaction_count,
            session.valid_transaction_count,
            session.id
        );
    }
}

fn print_transactions(transactions: &[StoredTransaction]) {
    if transactions.is_empty() {
        println!("No transactions found for this import");
        return;
    }

    for transaction in transactions {
        println!(
            "{}  {:>10.2}  {:<8} {:<18} {}",
            transaction.date,
            transaction.amount,
            transaction.kind,
            transaction.category,
            transaction.description
        );
    }
}
