//! Date helper functions

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt::Write;

/// Label shown for comments the store has not timestamped yet
pub const JUST_NOW: &str = "Just now";

/// Format a date using Moment.js-compatible format string
///
/// # Examples
/// ```ignore
/// format_date(&date, "YYYY-MM-DD") // -> "2024-01-15"
/// ```
pub fn format_date<Tz2: TimeZone>(date: &DateTime<Tz2>, format: &str) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    let mut out = String::new();
    if write!(out, "{}", date.format(&chrono_format)).is_err() {
        tracing::warn!("Invalid date format {:?}", format);
        return date_xml(date);
    }
    out
}

/// Whether `format` only contains specifiers chrono understands
pub fn is_valid_date_format(format: &str) -> bool {
    StrftimeItems::new(&moment_to_chrono_format(format)).all(|item| item != Item::Error)
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz2: TimeZone>(date: &DateTime<Tz2>) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

/// Parse an IANA zone name. Empty or unknown names fall back to UTC.
pub fn parse_timezone(name: &str) -> Tz {
    if name.is_empty() {
        return Tz::UTC;
    }
    name.parse().unwrap_or_else(|_| {
        tracing::warn!("Unknown timezone {:?}, using UTC", name);
        Tz::UTC
    })
}

/// Format a UTC instant in the site's zone
pub fn format_in_zone(date: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let local = date.with_timezone(&parse_timezone(timezone));
    format_date(&local, format)
}

/// Display text for a comment timestamp
pub fn comment_timestamp(date: Option<&DateTime<Utc>>, timezone: &str, format: &str) -> String {
    match date {
        Some(date) => format_in_zone(date, timezone, format),
        None => JUST_NOW.to_string(),
    }
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longer tokens first within each group
    let replacements = [
        // Year
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("D", "%-d"),
        // Hour
        ("HH", "%H"),
        ("hh", "%I"),
        // Minute, after MM is gone
        ("mm", "%M"),
        ("ss", "%S"),
        // Day of week
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("ZZ", "%z"),
        ("SSS", "%3f"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 22, 30, 0).unwrap()
    }

    #[test]
    fn test_format_date() {
        let date = instant();
        assert_eq!(format_date(&date, "YYYY-MM-DD"), "2024-01-15");
        assert_eq!(format_date(&date, "YYYY/MM/DD"), "2024/01/15");
        assert_eq!(format_date(&date, "MMMM D, YYYY"), "January 15, 2024");
    }

    #[test]
    fn test_invalid_format_does_not_panic() {
        assert!(is_valid_date_format("MMMM D, YYYY"));
        assert!(!is_valid_date_format("YYYY 100%"));
        assert!(!is_valid_date_format("%Q"));
        assert_eq!(format_date(&instant(), "YYYY 100%"), "2024-01-15T22:30:00.000+00:00");
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono_format("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(moment_to_chrono_format("HH:mm:ss"), "%H:%M:%S");
    }

    #[test]
    fn test_format_in_zone() {
        let date = instant();
        assert_eq!(format_in_zone(&date, "", "YYYY-MM-DD HH:mm"), "2024-01-15 22:30");
        assert_eq!(
            format_in_zone(&date, "Asia/Tokyo", "YYYY-MM-DD HH:mm"),
            "2024-01-16 07:30"
        );
        assert_eq!(format_in_zone(&date, "Mars/Olympus", "HH:mm"), "22:30");
    }

    #[test]
    fn test_comment_timestamp() {
        assert_eq!(comment_timestamp(None, "UTC", "YYYY-MM-DD"), "Just now");
        assert_eq!(
            comment_timestamp(Some(&instant()), "UTC", "YYYY-MM-DD"),
            "2024-01-15"
        );
    }
}
