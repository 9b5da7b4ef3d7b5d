//! Scheduled workout and completion record types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates;

/// Status of a scheduled workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutStatus {
    /// Planned, not yet done
    Pending,
    /// Done; completion timestamp is set
    Completed,
}

impl WorkoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutStatus::Pending => "pending",
            WorkoutStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WorkoutStatus::Pending),
            "completed" => Some(WorkoutStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Routine details copied onto a scheduled workout for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineSummary {
    /// Routine this entry was created from
    pub routine_id: Uuid,
    /// Routine name
    pub name: String,
    /// Routine category (e.g. "cardio", "strength")
    pub category: String,
    /// Planned duration in minutes
    pub duration_minutes: u32,
    /// Estimated calories for one session
    pub calories: u32,
    /// Exercise names, in order
    pub exercises: Vec<String>,
}

/// One routine assigned to a calendar date for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledWorkout {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Denormalized routine summary
    pub routine: RoutineSummary,
    /// Local calendar date
    pub scheduled_date: NaiveDate,
    /// Current status
    pub status: WorkoutStatus,
    /// Set if and only if `status` is `Completed`
    pub completed_at: Option<DateTime<Utc>>,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

impl ScheduledWorkout {
    /// Create a new pending entry.
    pub fn new(user_id: Uuid, routine: RoutineSummary, scheduled_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            routine,
            scheduled_date,
            status: WorkoutStatus::Pending,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Routine identifier.
    pub fn routine_id(&self) -> Uuid {
        self.routine.routine_id
    }

    /// Whether the entry has been completed.
    pub fn is_completed(&self) -> bool {
        self.status == WorkoutStatus::Completed
    }

    /// Mark as completed at the given instant.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = WorkoutStatus::Completed;
        self.completed_at = Some(at);
    }

    /// Move to a new date; resets to pending.
    pub fn reschedule_to(&mut self, date: NaiveDate) {
        self.scheduled_date = date;
        self.status = WorkoutStatus::Pending;
        self.completed_at = None;
    }
}

/// Duration and calories attributed to one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Effort {
    pub duration_minutes: u32,
    pub calories_burned: u32,
}

impl Effort {
    /// Estimate from the routine's planned duration and calories.
    pub fn estimated(routine: &RoutineSummary) -> Self {
        Self {
            duration_minutes: routine.duration_minutes,
            calories_burned: routine.calories,
        }
    }
}

/// Where a completion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "scheduled_workout_id")]
pub enum CompletionSource {
    /// Completion of a scheduled workout
    Scheduled(Uuid),
    /// "Done today" without a prior schedule link
    AdHoc,
}

impl CompletionSource {
    /// Linked scheduled workout, if any.
    pub fn scheduled_workout_id(&self) -> Option<Uuid> {
        match self {
            CompletionSource::Scheduled(id) => Some(*id),
            CompletionSource::AdHoc => None,
        }
    }
}

/// Historical fact that a user finished a workout on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub routine_id: Uuid,
    pub source: CompletionSource,
    /// Local calendar date; the unit for streak and weekly aggregation
    pub completed_date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub calories_burned: u32,
}

impl CompletionRecord {
    /// Record for a scheduled workout that was just completed.
    pub fn for_entry(entry: &ScheduledWorkout, effort: Effort, at: DateTime<Utc>) -> Self {
        Self::build(
            entry.user_id,
            entry.routine_id(),
            CompletionSource::Scheduled(entry.id),
            effort,
            at,
        )
    }

    /// Record for an ad-hoc completion.
    pub fn ad_hoc(user_id: Uuid, routine_id: Uuid, effort: Effort, at: DateTime<Utc>) -> Self {
        Self::build(user_id, routine_id, CompletionSource::AdHoc, effort, at)
    }

    fn build(
        user_id: Uuid,
        routine_id: Uuid,
        source: CompletionSource,
        effort: Effort,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            routine_id,
            source,
            completed_date: dates::local_date_of(at),
            completed_at: at,
            duration_minutes: effort.duration_minutes,
            calories_burned: effort.calories_burned,
        }
    }
}
