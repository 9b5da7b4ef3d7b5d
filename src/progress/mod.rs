//! Progress module.
//!
//! Pure calculators over completion history:
//! - Consecutive active day streaks
//! - Aggregate, weekly and monthly totals
//! - Per-date activity for calendar heatmaps

pub mod stats;
pub mod streak;

pub use stats::{
    activity_by_date, calculate, load_stats, monthly_totals, progress_percentage, AggregateStats,
    MonthlyTotals,
};
pub use streak::{current_streak, current_streak_from_strs};
