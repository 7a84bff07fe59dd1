//! Validates and normalises raw CSV records into transactions.
//!
//! Validation is total: a record that fails validation still produces a
//! [ParsedTransaction], with the failures recorded on it in a fixed
//! priority order (date, then amount, then description) so the caller can
//! show every problem with a row instead of only the last one found.

use std::fmt::Display;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize, Serializer};
use time::{Date, Month, format_description::BorrowedFormatItem, macros::format_description};

use crate::csv_import::RawRecord;

/// The categories a transaction can be filed under.
pub const CATEGORIES: [&str; 8] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Bills & Utilities",
    "Entertainment",
    "Health & Fitness",
    "Travel",
    "Other",
];

/// The category given to transactions whose source row does not name one.
pub const DEFAULT_CATEGORY: &str = "Other";

const ISO_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Whether a transaction brought money in or sent money out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received, e.g. a salary payment or an account top-up.
    Income,
    /// Money spent, e.g. a card payment.
    Expense,
}

impl TransactionKind {
    /// The kind as it is stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(FromSqlError::Other(
                format!("\"{other}\" is not a transaction kind").into(),
            )),
        }
    }
}

/// A reason a raw record failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    /// No date column held a value.
    MissingDate,
    /// The date value was not a real calendar date.
    InvalidDate,
    /// The amount column was absent or blank.
    MissingAmount,
    /// The amount value did not contain a number.
    InvalidAmount,
    /// The description column was absent or blank.
    MissingDescription,
}

impl ValidationFailure {
    /// The human-readable reason shown to the user.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationFailure::MissingDate => "Missing completed date",
            ValidationFailure::InvalidDate => "Invalid date format",
            ValidationFailure::MissingAmount => "Missing amount",
            ValidationFailure::InvalidAmount => "Invalid amount format",
            ValidationFailure::MissingDescription => "Missing description",
        }
    }
}

impl Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ValidationFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A transaction normalised from one raw CSV record.
///
/// Produced by [validate_record]; the caller may adjust [category](Self::category)
/// before persisting the batch. Only valid transactions are ever stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTransaction {
    /// When the transaction happened. `None` when the date failed validation.
    pub date: Option<Date>,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned. `None` when the amount failed validation.
    pub amount: Option<f64>,
    /// The category the transaction is filed under, [DEFAULT_CATEGORY] unless
    /// the source row named one.
    pub category: String,
    /// Whether the transaction is income or an expense, mapped from the
    /// source row's type code.
    pub kind: TransactionKind,
    /// The description exactly as it was read from the source row,
    /// unaffected by later edits to [description](Self::description).
    pub original_description: String,
    /// Every validation failure for this record, in priority order
    /// (date, amount, description). Empty for a valid record.
    pub failures: Vec<ValidationFailure>,
}

impl ParsedTransaction {
    /// Whether the record passed every validation check.
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// The highest-priority validation failure, if any.
    pub fn invalid_reason(&self) -> Option<&'static str> {
        self.failures.first().map(ValidationFailure::as_str)
    }
}

/// Validate and normalise a single raw CSV record.
///
/// Never fails: every problem with the record is collected into
/// [ParsedTransaction::failures] and the record is returned for review.
pub fn validate_record(record: &RawRecord) -> ParsedTransaction {
    let mut failures = Vec::new();

    let date = match date_field(record) {
        None => {
            failures.push(ValidationFailure::MissingDate);
            None
        }
        Some(value) => {
            let date = parse_import_date(value);
            if date.is_none() {
                tracing::debug!("Could not parse \"{value}\" as a date");
                failures.push(ValidationFailure::InvalidDate);
            }
            date
        }
    };

    let amount = match non_blank(record.get("Amount")) {
        None => {
            failures.push(ValidationFailure::MissingAmount);
            None
        }
        Some(value) => {
            let amount = parse_amount(value);
            if amount.is_none() {
                tracing::debug!("Could not parse \"{value}\" as an amount");
                failures.push(ValidationFailure::InvalidAmount);
            }
            amount
        }
    };

    let raw_description = record.get("Description").unwrap_or_default();
    if raw_description.trim().is_empty() {
        failures.push(ValidationFailure::MissingDescription);
    }

    let kind = match non_blank(record.get("Type")).map(str::trim) {
        Some("TOPUP") => TransactionKind::Income,
        Some("TRANSFER") if amount.is_some_and(|amount| amount > 0.0) => TransactionKind::Income,
        _ => TransactionKind::Expense,
    };

    let category = non_blank(record.get("Category"))
        .map(|category| category.trim().to_owned())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned());

    ParsedTransaction {
        date,
        description: raw_description.to_owned(),
        amount,
        category,
        kind,
        original_description: raw_description.to_owned(),
        failures,
    }
}

/// Validate and normalise every record of a parsed CSV file.
///
/// Records with fewer than two populated fields are treated as blank or
/// malformed statement lines and dropped. The remaining records are
/// validated in input order.
pub fn normalize_batch(records: &[RawRecord]) -> Vec<ParsedTransaction> {
    records
        .iter()
        .filter(|record| record.populated_field_count() >= 2)
        .map(validate_record)
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// The value of the date column, preferring the statement's
/// `Completed Date` over the generic fallbacks.
fn date_field(record: &RawRecord) -> Option<&str> {
    non_blank(record.get("Completed Date"))
        .or_else(|| non_blank(record.get("Date")))
        .or_else(|| non_blank(record.get("date")))
}

/// Parses a statement date in `DD/MM/YYYY` format with an optional
/// `HH:mm[:ss]` suffix, or an ISO `YYYY-MM-DD` date.
///
/// Returns `None` for anything that is not a real calendar date.
fn parse_import_date(value: &str) -> Option<Date> {
    let date_part = value.trim().split_whitespace().next()?;

    parse_day_month_year(date_part)
        .or_else(|| Date::parse(date_part, &ISO_DATE_FORMAT).ok())
}

fn parse_day_month_year(value: &str) -> Option<Date> {
    let mut parts = value.split('/');
    let day = parts.next()?;
    let month = parts.next()?;
    let year = parts.next()?;

    if parts.next().is_some() {
        return None;
    }

    let day: u8 = day.parse().ok()?;
    let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
    let year: i32 = year.parse().ok()?;

    // from_calendar_date rejects days that do not exist in the month,
    // e.g. 31/02/2024.
    Date::from_calendar_date(year, month, day).ok()
}

/// Parses an amount string, ignoring currency symbols and thousands
/// separators: every character except digits, `-`, and `.` is stripped
/// before parsing.
fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|character| character.is_ascii_digit() || *character == '-' || *character == '.')
        .collect();

    cleaned.parse().ok()
}


#[cfg(test)]
mod normalize_batch_tests {
    use crate::csv_import::{RawRecord, parse_csv};

    use super::normalize_batch;

    #[test]
    fn drops_records_with_fewer_than_two_populated_fields() {
        let records = vec![
            [("Description", "Coffee"), ("Amount", "-4.50")]
                .into_iter()
                .collect::<RawRecord>(),
            [("Description", "stray line")]
                .into_iter()
                .collect::<RawRecord>(),
            [("Description", ""), ("Amount", "")]
                .into_iter()
                .collect::<RawRecord>(),
        ];

        let batch = normalize_batch(&records);

        assert_eq!(batch.len(), 1, "want 1 transaction, got {}", batch.len());
        assert_eq!(batch[0].description, "Coffee");
    }

    #[test]
    fn preserves_input_order() {
        let csv_data = "Type,Completed Date,Description,Amount\n\
            CARD_PAYMENT,01/06/2024 10:00,Coffee,-4.50\n\
            CARD_PAYMENT,02/06/2024 12:30,Lunch,-11.20\n\
            TOPUP,03/06/2024 08:00,Salary,2500.00";
        let records = parse_csv(csv_data).expect("Could not parse CSV");

        let batch = normalize_batch(&records);

        let descriptions: Vec<&str> = batch
            .iter()
            .map(|transaction| transaction.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["Coffee", "Lunch", "Salary"]);
    }

    #[test]
    fn keeps_invalid_records_for_review() {
        let csv_data = "Type,Completed Date,Description,Amount\n\
            CARD_PAYMENT,01/06/2024 10:00,Coffee,-4.50\n\
            CARD_PAYMENT,bad date,Lunch,-11.20";
        let records = parse_csv(csv_data).expect("Could not parse CSV");

        let batch = normalize_batch(&records);

        assert_eq!(batch.len(), 2, "want 2 transactions, got {}", batch.len());
        assert!(batch[0].is_valid());
        assert!(!batch[1].is_valid());
        assert_eq!(batch[1].invalid_reason(), Some("Invalid date format"));
    }
}
