//! Timestamp parsing for the loosely formatted dates the services emit.
//!
//! Bugzilla writes `2013-10-01 12:34:56 +0000`, sometimes without seconds or
//! with a zone abbreviation instead of an offset; the SR service writes a
//! naive `2013-01-01 21:22:23`. Everything is normalised to UTC, naive values
//! are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M %z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a timestamp, returning `None` when no known layout matches.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    // Drop a trailing zone abbreviation such as "CET" or "UTC".
    let stripped = match value.rsplit_once(' ') {
        Some((head, zone)) if !zone.is_empty() && zone.chars().all(|c| c.is_ascii_alphabetic()) => {
            head
        }
        _ => value,
    };

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(stripped, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }

    NaiveDate::parse_from_str(stripped, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_offset_timestamp() {
        let parsed = parse_timestamp("2013-10-01 12:34:56 +0200").unwrap();
        assert_eq!(parsed.hour(), 10);
    }

    #[test]
    fn test_naive_and_abbreviated() {
        assert!(parse_timestamp("2013-01-01 21:22:23").is_some());
        assert!(parse_timestamp("2004-06-02 17:22 CEST").is_some());
        assert!(parse_timestamp("2004-06-02").is_some());
    }

    #[test]
    fn test_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
