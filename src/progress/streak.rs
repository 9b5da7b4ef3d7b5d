//! Consecutive active day streaks.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::dates;

/// Current streak ending today or yesterday.
///
/// Dates are deduplicated, so several workouts on one day count once. A most
/// recent active day older than yesterday means the streak is broken. Days
/// after `today` are ignored.
pub fn current_streak<I>(completion_dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let unique: BTreeSet<NaiveDate> = completion_dates
        .into_iter()
        .filter(|date| *date <= today)
        .collect();

    let mut days = unique.iter().rev();
    let Some(&latest) = days.next() else {
        return 0;
    };

    if dates::days_between(latest, today) > 1 {
        return 0;
    }

    let mut streak = 1;
    let mut previous = latest;
    for &date in days {
        if dates::days_between(date, previous) != 1 {
            break;
        }
        streak += 1;
        previous = date;
    }

    streak
}

/// Streak over `YYYY-MM-DD` strings; unparseable entries are skipped.
pub fn current_streak_from_strs<'a, I>(completion_dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    current_streak(
        completion_dates
            .into_iter()
            .filter_map(|value| dates::parse_date(value).ok()),
        today,
    )
}
