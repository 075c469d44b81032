//! Timestamp parsing for upstream payloads and date arguments.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;
use crate::models::{DATE_FORMAT, TIMESTAMP_FORMAT};

static RELATIVE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s+(day|days|week|weeks|month|months)\s+ago$").expect("static regex")
});

/// Layouts with an offset, tried after RFC 3339 and RFC 2822.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"];

/// Layouts without an offset, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// Parse the timestamp shapes seen across feeds and JSON APIs into UTC.
///
/// Accepts RFC 3339, RFC 2822, ISO-8601 with or without an offset, a bare
/// `YYYY-MM-DD` (midnight), and Unix epoch seconds or milliseconds.
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
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
    }
    if let Ok(n) = s.parse::<i64>() {
        // 13 digits or more is milliseconds
        return if n.abs() >= 1_000_000_000_000 {
            DateTime::from_timestamp_millis(n)
        } else {
            DateTime::from_timestamp(n, 0)
        };
    }
    None
}

/// Render a timestamp in the sortable `created_at` layout.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Resolve `YYYY-MM-DD` or `N day(s)/week(s)/month(s) ago` against `today`.
///
/// A month counts as 30 days.
pub fn resolve_date_arg(raw: &str, today: NaiveDate) -> Result<NaiveDate, ConfigError> {
    let s = raw.trim().to_lowercase();
    if let Some(caps) = RELATIVE_DATE.captures(&s) {
        let invalid = || ConfigError::InvalidDate(raw.to_string());
        let n: i64 = caps[1].parse().map_err(|_| invalid())?;
        let days = match &caps[2] {
            "day" | "days" => Some(n),
            "week" | "weeks" => n.checked_mul(7),
            _ => n.checked_mul(30),
        };
        return days
            .and_then(Duration::try_days)
            .and_then(|delta| today.checked_sub_signed(delta))
            .ok_or_else(invalid);
    }
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|_| ConfigError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> String {
        format_timestamp(&parse_timestamp(s).unwrap())
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        assert_eq!(ts("2025-01-02T03:04:05Z"), "2025-01-02 03:04:05");
        assert_eq!(ts("2025-01-02T03:04:05+02:00"), "2025-01-02 01:04:05");
        assert_eq!(ts("2025-01-02T03:04:05.123+0000"), "2025-01-02 03:04:05");
        assert_eq!(ts("Thu, 02 Jan 2025 03:04:05 +0000"), "2025-01-02 03:04:05");
        assert_eq!(ts("2025-01-02 03:04:05"), "2025-01-02 03:04:05");
        assert_eq!(ts("2025-01-02"), "2025-01-02 00:00:00");
        assert_eq!(ts("1735787045"), "2025-01-02 03:04:05");
        assert_eq!(ts("1735787045000"), "2025-01-02 03:04:05");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday-ish").is_none());
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn test_resolve_date_arg() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(
            resolve_date_arg("2025-01-15", today).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
        assert_eq!(
            resolve_date_arg("7 days ago", today).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 24).unwrap()
        );
        assert_eq!(
            resolve_date_arg("1 Week Ago", today).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 24).unwrap()
        );
        assert_eq!(
            resolve_date_arg("2 months ago", today).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 30).unwrap()
        );
        assert!(matches!(
            resolve_date_arg("last tuesday", today),
            Err(ConfigError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_resolve_date_arg_out_of_range_is_invalid() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        for raw in [
            "99999999999999999 days ago",
            "999999999999999999 weeks ago",
            "9999999999999999999 months ago",
            "99999999999999999999 days ago",
            "40000000 months ago",
        ] {
            assert!(
                matches!(resolve_date_arg(raw, today), Err(ConfigError::InvalidDate(_))),
                "{raw}"
            );
        }
    }
}
