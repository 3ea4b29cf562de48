//! CSV export of activity logs.

use std::borrow::Cow;

use chrono::{DateTime, Utc};

use super::types::ActivityLog;
use crate::datetime::format_datetime;

/// CSV header row.
pub const CSV_HEADER: [&str; 7] = [
    "Log ID",
    "Username",
    "Action",
    "Resource Type",
    "Resource ID",
    "Details",
    "Created At",
];

const EXPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Quote a field when it contains a delimiter, quote or line break.
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = Cow<'a, str>>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        out.push_str(&csv_field(&field));
        first = false;
    }
    out.push_str("\r\n");
}

/// Render logs as CSV with timestamps in `timezone`.
pub fn export_csv(logs: &[ActivityLog], timezone: &str) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|h| Cow::Borrowed(*h)));

    for log in logs {
        push_row(
            &mut out,
            [
                Cow::Owned(log.id.to_string()),
                Cow::Borrowed(log.username.as_str()),
                Cow::Borrowed(log.action.as_str()),
                Cow::Borrowed(log.resource_type.as_str()),
                Cow::Owned(log.resource_id.map(|id| id.to_string()).unwrap_or_default()),
                Cow::Borrowed(log.details.as_deref().unwrap_or("")),
                Cow::Owned(format_datetime(&log.created_at, timezone, EXPORT_TIME_FORMAT)),
            ],
        );
    }
    out
}

/// Attachment name for an export made at `now`.
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("activity_logs_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
