use chrono::{DateTime, SecondsFormat, Utc};

/// `2026-10-19T08:30:00.000Z`, the shape browsers produce with `toISOString`.
pub fn iso_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Calendar date of `at` in UTC.
pub fn iso_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Filesystem-safe instant for export filenames (no colons).
pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}
