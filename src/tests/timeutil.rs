// Unit Tests for Time Utilities
//
// UNIT UNDER TEST: timeutil module
//
// BUSINESS RESPONSIBILITY:
//   - Parses heterogeneous timestamps (epoch seconds/milliseconds, ISO-8601,
//     plain datetime strings) without ever raising
//   - Produces sorted timestamp sequences for range computation
//   - Formats human-readable time and date ranges for prompts and reports
//
// TEST COVERAGE:
//   - Numeric epoch parsing with the milliseconds threshold
//   - String parsing across the accepted formats
//   - Graceful None on garbage input
//   - Range formatting with missing endpoints

use crate::timeutil::{
    build_date_range, build_time_range, extract_times, format_time, to_datetime,
};
use chrono::NaiveDate;
use serde_json::json;

fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .and_then(|date| date.and_hms_opt(h, mi, s))
        .expect("valid test datetime")
}

#[cfg(test)]
mod to_datetime_tests {
    use super::*;

    #[test]
    fn test_epoch_seconds_parse_to_utc_naive() {
        // 2026-01-20 10:00:00 UTC
        let parsed = to_datetime(&json!(1768903200));
        assert_eq!(parsed, Some(dt(2026, 1, 20, 10, 0, 0)));
    }

    #[test]
    fn test_epoch_above_threshold_is_milliseconds() {
        // Same instant, in milliseconds
        let parsed = to_datetime(&json!(1768903200000i64));
        assert_eq!(parsed, Some(dt(2026, 1, 20, 10, 0, 0)));
    }

    #[test]
    fn test_float_epoch_is_accepted() {
        let parsed = to_datetime(&json!(1768903200.7));
        assert_eq!(parsed, Some(dt(2026, 1, 20, 10, 0, 0)));
    }

    #[test]
    fn test_numeric_string_is_epoch() {
        let parsed = to_datetime(&json!("1768903200"));
        assert_eq!(parsed, Some(dt(2026, 1, 20, 10, 0, 0)));
    }

    #[test]
    fn test_iso8601_with_offset_normalizes_to_utc() {
        let parsed = to_datetime(&json!("2026-01-20T18:00:00+08:00"));
        assert_eq!(parsed, Some(dt(2026, 1, 20, 10, 0, 0)));
    }

    #[test]
    fn test_plain_datetime_string() {
        let parsed = to_datetime(&json!("2026-01-20 10:00:00"));
        assert_eq!(parsed, Some(dt(2026, 1, 20, 10, 0, 0)));
    }

    #[test]
    fn test_garbage_returns_none_without_panicking() {
        assert_eq!(to_datetime(&json!("soon")), None);
        assert_eq!(to_datetime(&json!(null)), None);
        assert_eq!(to_datetime(&json!([1, 2])), None);
        assert_eq!(to_datetime(&json!("")), None);
    }
}

#[cfg(test)]
mod range_tests {
    use super::*;

    #[test]
    fn test_extract_times_sorts_and_drops_unparseable() {
        let values = vec![json!(1768906800), json!("nope"), json!(1768903200)];
        let times = extract_times(values.iter());

        assert_eq!(times.len(), 2, "Unparseable entries should be dropped");
        assert!(times[0] < times[1], "Output should be sorted ascending");
    }

    #[test]
    fn test_format_time_is_wall_clock_only() {
        assert_eq!(format_time(dt(2026, 1, 20, 9, 5, 3)), "09:05:03");
    }

    #[test]
    fn test_time_range_with_both_endpoints() {
        let range = build_time_range(
            Some(dt(2026, 1, 20, 10, 12, 3)),
            Some(dt(2026, 1, 20, 14, 55, 10)),
        );
        assert_eq!(range, "10:12:03\u{2013}14:55:10");
    }

    #[test]
    fn test_time_range_degrades_with_missing_endpoints() {
        assert_eq!(
            build_time_range(Some(dt(2026, 1, 20, 10, 0, 0)), None),
            "10:00:00"
        );
        assert_eq!(build_time_range(None, None), "");
    }

    #[test]
    fn test_date_range_includes_dates() {
        let range = build_date_range(
            Some(dt(2026, 1, 20, 10, 0, 0)),
            Some(dt(2026, 1, 20, 23, 59, 59)),
        );
        assert_eq!(range, "2026-01-20 10:00:00 \u{2013} 2026-01-20 23:59:59");
    }
}
