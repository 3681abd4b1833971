//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;

use crate::models::{PaymentStatus, RoomStatus, Visibility};

/// Storage format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn conversion_error(column: usize, message: String) -> SqlError {
    SqlError::FromSqlConversionFailure(column, Type::Text, message.into())
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Parse a calendar date stored as `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Parse an optional calendar date
pub fn parse_date_opt(s: Option<String>) -> Result<Option<NaiveDate>, SqlError> {
    s.map(|s| parse_date(&s)).transpose()
}

/// Format a calendar date for storage
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a room status column
pub fn parse_room_status(s: &str) -> Result<RoomStatus, SqlError> {
    RoomStatus::parse(s).ok_or_else(|| conversion_error(0, format!("unknown room status '{s}'")))
}

/// Parse a payment status column
pub fn parse_payment_status(s: &str) -> Result<PaymentStatus, SqlError> {
    PaymentStatus::parse(s)
        .ok_or_else(|| conversion_error(0, format!("unknown payment status '{s}'")))
}

/// Convert the stored public flag
pub fn visibility_from_i32(value: i32) -> Visibility {
    Visibility::from_public(value != 0)
}

/// Whether an error is a UNIQUE or PRIMARY KEY constraint violation
pub fn is_unique_violation(err: &SqlError) -> bool {
    match err {
        SqlError::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_roundtrip_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(format_date(date), "2024-03-01");
        assert_eq!(parse_date("2024-03-01").unwrap(), date);
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(parse_room_status("paused").is_err());
        assert!(parse_payment_status("refunded").is_err());
    }
}
