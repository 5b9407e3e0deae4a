//! Time utilities for heterogeneous message timestamps.
//!
//! Store rows carry `create_time` as epoch seconds, epoch milliseconds,
//! ISO-8601 strings, or `YYYY-MM-DD HH:MM:SS`. Everything here is a pure
//! function that converts to UTC-naive datetimes and never panics; values
//! that cannot be interpreted come back as `None`.

use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

/// Epoch values above this are treated as milliseconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Convert a heterogeneous timestamp value to a UTC-naive datetime.
///
/// Accepts integer/float epoch seconds (milliseconds when > 10^12),
/// ISO-8601 strings (offset normalized to UTC), and the plain
/// `YYYY-MM-DD HH:MM:SS` form. Returns `None` on anything else.
pub fn to_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                from_epoch(i)
            } else {
                n.as_f64().and_then(|f| from_epoch(f as i64))
            }
        }
        Value::String(s) => parse_datetime_str(s),
        _ => None,
    }
}

/// Interpret an epoch number, scaling milliseconds down to seconds.
pub fn from_epoch(epoch: i64) -> Option<NaiveDateTime> {
    let seconds = if epoch > MILLIS_THRESHOLD {
        epoch / 1000
    } else {
        epoch
    };
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.naive_utc())
}

fn parse_datetime_str(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Numeric strings are epoch values in disguise.
    if let Ok(epoch) = trimmed.parse::<i64>() {
        return from_epoch(epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").ok()
}

/// Collect the parseable timestamps out of a value sequence, sorted ascending.
pub fn extract_times<'a, I>(values: I) -> Vec<NaiveDateTime>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut times: Vec<NaiveDateTime> = values.into_iter().filter_map(to_datetime).collect();
    times.sort();
    times
}

/// Format a datetime as `HH:MM:SS`.
pub fn format_time(ts: NaiveDateTime) -> String {
    ts.format("%H:%M:%S").to_string()
}

/// Human-readable span between two datetimes, times only.
///
/// Falls back to a single time when either endpoint is missing, and to an
/// empty string when both are.
pub fn build_time_range(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> String {
    match (start, end) {
        (Some(s), Some(e)) => format!("{}\u{2013}{}", format_time(s), format_time(e)),
        (Some(s), None) => format_time(s),
        (None, Some(e)) => format_time(e),
        (None, None) => String::new(),
    }
}

/// Human-readable span including dates, for batches that cross midnight.
pub fn build_date_range(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> String {
    let fmt = |ts: NaiveDateTime| ts.format("%Y-%m-%d %H:%M:%S").to_string();
    match (start, end) {
        (Some(s), Some(e)) => format!("{} \u{2013} {}", fmt(s), fmt(e)),
        (Some(s), None) => fmt(s),
        (None, Some(e)) => fmt(e),
        (None, None) => String::new(),
    }
}
