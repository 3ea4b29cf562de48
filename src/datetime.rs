//! Date/time helpers.
//!
//! Timestamps are stored by SQLite as UTC text (`YYYY-MM-DD HH:MM:SS`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// SQLite `datetime('now')` format.
pub const SQLITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a stored UTC timestamp.
pub fn parse_db_datetime(datetime_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(datetime_str) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(datetime_str, SQLITE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a stored UTC timestamp in the given timezone.
///
/// Returns the input unchanged if either the timestamp or the timezone
/// cannot be parsed.
pub fn format_datetime(datetime_str: &str, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return datetime_str.to_string(),
    };

    match parse_db_datetime(datetime_str) {
        Some(utc) => utc.with_timezone(&tz).format(format).to_string(),
        None => datetime_str.to_string(),
    }
}

/// Convert a UTC time into the stored text format.
pub fn to_db_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(SQLITE_FORMAT).to_string()
}

/// Convert a database datetime string to RFC3339 (`2024-01-15T10:30:00Z`).
pub fn to_rfc3339(datetime_str: &str) -> String {
    if datetime_str.ends_with('Z') || datetime_str.contains('+') {
        return datetime_str.to_string();
    }
    format!("{}Z", datetime_str.replace(' ', "T"))
}

/// Parse a `YYYY-MM-DD` date filter.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Lower bound (inclusive) of a date filter in stored format.
pub fn start_of_day(date: NaiveDate) -> String {
    format!("{} 00:00:00", date.format("%Y-%m-%d"))
}

/// Upper bound (inclusive) of a date filter in stored format.
pub fn end_of_day(date: NaiveDate) -> String {
    format!("{} 23:59:59", date.format("%Y-%m-%d"))
}
