//! Time utilities: timestamp (de)serialization, durations, formatting minutes.

use chrono::{DateTime, Local, SecondsFormat, Utc};

/// Stored form of an event timestamp (RFC 3339, local offset, millis).
pub fn ts_to_db(ts: &DateTime<Local>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Parse a stored timestamp back into local time.
pub fn ts_from_db(s: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}

/// Bookkeeping stamp (`created_at`, `updated_at`), always UTC so it sorts as text.
pub fn utc_stamp(ts: &DateTime<Local>) -> String {
    ts.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whole minutes between two instants, rounded to the nearest minute.
pub fn rounded_minutes_between(start: &DateTime<Local>, end: &DateTime<Local>) -> i64 {
    let ms = (*end - *start).num_milliseconds();
    (ms as f64 / 60_000.0).round() as i64
}

/// Hours between two instants, unrounded.
pub fn hours_between(start: &DateTime<Local>, end: &DateTime<Local>) -> f64 {
    (*end - *start).num_milliseconds() as f64 / 3_600_000.0
}

pub fn format_minutes(mins: i64) -> String {
    let sign = if mins < 0 { "-" } else { "" };
    let m = mins.abs();
    format!("{}{:02}:{:02}", sign, m / 60, m % 60)
}

/// 7.5 → "07:30"
pub fn format_hours(hours: f64) -> String {
    format_minutes((hours * 60.0).round() as i64)
}
