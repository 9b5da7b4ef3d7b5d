//! Workout scheduling.
//!
//! Assigns routines to calendar dates, completes them and keeps the
//! completion history that progress and medals are derived from.

pub mod store;
pub mod types;

pub use store::{CompletionOutcome, ScheduleError, ScheduleStore};
pub use types::{
    CompletionRecord, CompletionSource, Effort, RoutineSummary, ScheduledWorkout, WorkoutStatus,
};
