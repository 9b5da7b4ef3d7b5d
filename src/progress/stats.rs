//! Aggregate statistics over completion history.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::dates;
use crate::progress::streak::current_streak;
use crate::schedule::CompletionRecord;
use crate::storage::config::StatsSettings;
use crate::storage::database::DatabaseError;
use crate::storage::repository::{CompletionFilter, CompletionRepository};

/// Summary statistics for a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// All-time completions, independent of the window
    pub total_completed: u64,
    /// Completions inside the window
    pub window_completed: u64,
    pub total_minutes: u64,
    pub total_calories: u64,
    pub average_duration: u32,
    pub average_calories: u32,
    /// Unique active days in the current Monday-Sunday week
    pub this_week_completed: u32,
    pub streak: u32,
    /// Not tracked
    pub early_morning_count: Option<u64>,
}

/// Totals for one calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub total_workouts: u32,
    pub total_minutes: u64,
    pub total_calories: u64,
}

/// Reduce a window of completions into stats relative to local `now`.
///
/// Averages divide the window sums by the all-time `total_completed`.
pub fn calculate(
    records: &[CompletionRecord],
    total_completed: u64,
    now: NaiveDateTime,
) -> AggregateStats {
    let total_minutes: u64 = records.iter().map(|r| u64::from(r.duration_minutes)).sum();
    let total_calories: u64 = records.iter().map(|r| u64::from(r.calories_burned)).sum();
    let window_completed = records.len() as u64;

    let (week_start, week_end) = dates::week_bounds(now);
    let this_week: BTreeSet<NaiveDate> = records
        .iter()
        .filter(|r| {
            let at = r.completed_at.with_timezone(&Local).naive_local();
            at >= week_start && at <= week_end
        })
        .map(|r| r.completed_date)
        .collect();

    AggregateStats {
        total_completed,
        window_completed,
        total_minutes,
        total_calories,
        average_duration: average(total_minutes, total_completed),
        average_calories: average(total_calories, total_completed),
        this_week_completed: this_week.len() as u32,
        streak: current_streak(records.iter().map(|r| r.completed_date), now.date()),
        early_morning_count: None,
    }
}

fn average(sum: u64, count: u64) -> u32 {
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as u32
}

/// Load the stats window for a user and reduce it.
pub async fn load_stats<R>(
    completions: &R,
    user_id: Uuid,
    settings: &StatsSettings,
    now: NaiveDateTime,
) -> Result<AggregateStats, DatabaseError>
where
    R: CompletionRepository + ?Sized,
{
    let since = now.date() - Duration::days(i64::from(settings.window_days));
    let filter = CompletionFilter {
        since: Some(since),
        until: None,
        limit: Some(settings.window_limit),
    };

    let window = completions.list_completions(user_id, &filter).await?;
    let total_completed = completions.count_completions(user_id).await?;

    let stats = calculate(&window, total_completed, now);
    tracing::debug!(
        %user_id,
        total = stats.total_completed,
        window = stats.window_completed,
        streak = stats.streak,
        "Loaded stats"
    );
    Ok(stats)
}

/// Sum completions into monthly totals.
pub fn monthly_totals(records: &[CompletionRecord]) -> MonthlyTotals {
    records.iter().fold(MonthlyTotals::default(), |mut totals, r| {
        totals.total_workouts += 1;
        totals.total_minutes += u64::from(r.duration_minutes);
        totals.total_calories += u64::from(r.calories_burned);
        totals
    })
}

/// Completion count per calendar date.
pub fn activity_by_date(records: &[CompletionRecord]) -> BTreeMap<NaiveDate, u32> {
    let mut activity = BTreeMap::new();
    for record in records {
        *activity.entry(record.completed_date).or_insert(0) += 1;
    }
    activity
}

/// Rounded percentage of `threshold` reached, clamped to 0-100.
pub fn progress_percentage(current: u64, threshold: u64) -> u8 {
    if threshold == 0 {
        return 100;
    }
    let percent = (current as f64 / threshold as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}
