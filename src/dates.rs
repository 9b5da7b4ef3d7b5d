//! Local calendar date helpers.
//!
//! Every date that crosses the store boundary is a local `YYYY-MM-DD` calendar
//! date. Timestamps are shifted into the local offset before they are truncated,
//! so a late-evening workout never lands on the following UTC day.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

/// Wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in the local time zone.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Current local wall-clock time.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Local calendar date of a UTC timestamp.
pub fn local_date_of(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| DateError::Invalid(value.to_string()))
}

/// Bounds of the week containing `now`: Monday 00:00:00 through Sunday 23:59:59.
pub fn week_bounds(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let (monday, _) = week_dates(now.date());
    let start = monday.and_time(NaiveTime::MIN);
    let end = start + Duration::days(7) - Duration::seconds(1);
    (start, end)
}

/// Monday and Sunday of the week containing `date`.
pub fn week_dates(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = i64::from(date.weekday().num_days_from_monday());
    let monday = date - Duration::days(offset);
    (monday, monday + Duration::days(6))
}

/// First and last day of a month, or `None` for an invalid year/month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// Whole days from `earlier` to `later`.
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Date parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_and_format() {
        let parsed = parse_date("2024-03-09").unwrap();
        assert_eq!(parsed, date(2024, 3, 9));
        assert_eq!(format_date(parsed), "2024-03-09");
        assert_eq!(parse_date(" 2024-03-09 ").unwrap(), parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_date("09/03/2024"), Err(DateError::Invalid(_))));
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_week_bounds_midweek() {
        // 2024-05-15 is a Wednesday
        let now = date(2024, 5, 15).and_hms_opt(14, 30, 0).unwrap();
        let (start, end) = week_bounds(now);
        assert_eq!(start, date(2024, 5, 13).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end, date(2024, 5, 19).and_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn test_week_bounds_on_sunday_and_monday() {
        let sunday = date(2024, 5, 19).and_hms_opt(23, 0, 0).unwrap();
        assert_eq!(week_bounds(sunday).0.date(), date(2024, 5, 13));

        let monday = date(2024, 5, 20).and_hms_opt(0, 0, 1).unwrap();
        let (start, _) = week_bounds(monday);
        assert_eq!(start.date(), date(2024, 5, 20));

        let previous_sunday = date(2024, 5, 19).and_hms_opt(23, 59, 59).unwrap();
        assert!(previous_sunday < start);
        assert!(monday >= start);
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(2024, 2),
            Some((date(2024, 2, 1), date(2024, 2, 29)))
        );
        assert_eq!(
            month_bounds(2023, 12),
            Some((date(2023, 12, 1), date(2023, 12, 31)))
        );
        assert_eq!(month_bounds(2024, 13), None);
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(date(2024, 2, 28), date(2024, 3, 1)), 2);
        assert_eq!(days_between(date(2024, 3, 1), date(2024, 3, 1)), 0);
    }
}
