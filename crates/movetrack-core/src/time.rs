//! Timestamp helpers
//!
//! All durations in movetrack are expressed in hours as `f64`.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Timestamp layouts tried, in order, when no explicit format is configured
pub const DEFAULT_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Elapsed time from `start` to `end` in hours (negative if `end` precedes `start`)
pub fn duration_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 3_600_000.0
}

/// Parse a timestamp as UTC using RFC 3339 or one of `formats`
///
/// Date-only values (`%Y-%m-%d`) are accepted as midnight.
pub fn parse_timestamp(value: &str, formats: &[String]) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let custom: Vec<&str> = formats.iter().map(String::as_str).collect();
    let formats: &[&str] = if custom.is_empty() {
        DEFAULT_TIMESTAMP_FORMATS
    } else {
        &custom
    };

    for format in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight));
    }

    Err(Error::Timestamp(format!("unrecognised timestamp '{value}'")))
}
