use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::{AppError, Result};

/// Parses an upstream timestamp. Full RFC 3339 values are taken as-is; bare
/// calendar dates (`2025-05-25`) are read as midnight UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::Timestamp(input.to_string()))
}

/// Whole days from `start` to `end`; `None` when `end` precedes `start`.
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<i64> {
    let days = (end - start).num_days();
    if end < start {
        None
    } else {
        Some(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_with_millis() {
        let ts = parse_timestamp("2025-05-25T10:15:00.000Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 5, 25, 10, 15, 0).unwrap());
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let ts = parse_timestamp("2025-05-25").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 5, 25, 0, 0, 0).unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_timestamp("next tuesday"),
            Err(AppError::Timestamp(_))
        ));
    }

    #[test]
    fn days_between_truncates_and_rejects_negative() {
        let start = parse_timestamp("2025-05-25").unwrap();
        let end = parse_timestamp("2025-06-10").unwrap();
        assert_eq!(days_between(start, end), Some(16));
        assert_eq!(days_between(end, start), None);
        let late = parse_timestamp("2025-06-10T23:59:00Z").unwrap();
        assert_eq!(days_between(start, late), Some(16));
    }
}
