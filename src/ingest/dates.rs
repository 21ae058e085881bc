//! Best-effort parsing of publication timestamps.
//!
//! Feeds use RFC 2822, APIs mostly RFC 3339, and news sites print whatever
//! their CMS likes. Timestamps without an offset are taken as UTC; a bare
//! date means midnight UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
    "%B %d, %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %d %B %Y",
];

/// Parse a timestamp string, or `None` if no known format matches.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_rfc_formats() {
        assert_eq!(parse_timestamp("2025-05-06T09:30:00+02:00"), Some(utc(2025, 5, 6, 7, 30)));
        assert_eq!(
            parse_timestamp("Tue, 06 May 2025 09:30:00 +0000"),
            Some(utc(2025, 5, 6, 9, 30))
        );
        assert_eq!(
            parse_timestamp("Tue, 06 May 2025 09:30:00 GMT"),
            Some(utc(2025, 5, 6, 9, 30))
        );
    }

    #[test]
    fn test_naive_formats_are_utc() {
        assert_eq!(parse_timestamp("2025-05-06T09:30:00"), Some(utc(2025, 5, 6, 9, 30)));
        assert_eq!(parse_timestamp("2025-05-06 09:30:00"), Some(utc(2025, 5, 6, 9, 30)));
        assert_eq!(parse_timestamp(" 2025-05-06 "), Some(utc(2025, 5, 6, 0, 0)));
        assert_eq!(parse_timestamp("May 6, 2025"), Some(utc(2025, 5, 6, 0, 0)));
        assert_eq!(parse_timestamp("06 May 2025"), Some(utc(2025, 5, 6, 0, 0)));
        assert_eq!(parse_timestamp("06/05/2025"), Some(utc(2025, 5, 6, 0, 0)));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2025-13-45"), None);
    }
}
