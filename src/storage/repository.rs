//! Persistence boundaries.
//!
//! Every collection is scoped by owning user. The SQLite store implements all of
//! these; a hosted backend can be slotted in behind the same traits.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::medals::{MedalDefinition, UnlockedMedal};
use crate::routines::{Category, Exercise, Routine};
use crate::schedule::{CompletionRecord, ScheduledWorkout, WorkoutStatus};
use crate::storage::database::DatabaseError;
use crate::users::{Role, UserProfile};

/// Filter for scheduled workout queries. Empty filter selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<WorkoutStatus>,
}

impl ScheduleFilter {
    /// Entries on a single date.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            from: Some(date),
            to: Some(date),
            status: None,
        }
    }
}

/// Filter for completion history queries, ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionFilter {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl CompletionFilter {
    /// Inclusive date range without a row limit.
    pub fn between(since: NaiveDate, until: NaiveDate) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
            limit: None,
        }
    }
}

/// Filter for user listings. Empty filter selects everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Case-insensitive substring of name or email
    pub search: Option<String>,
    pub role: Option<Role>,
}

/// Scheduled workout collection.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn insert_scheduled(&self, entry: &ScheduledWorkout) -> Result<(), DatabaseError>;

    /// Fails with `NotFound` when no row with the entry's id and user exists.
    async fn update_scheduled(&self, entry: &ScheduledWorkout) -> Result<(), DatabaseError>;

    /// Fails with `NotFound` when nothing was deleted.
    async fn delete_scheduled(&self, user_id: Uuid, id: Uuid) -> Result<(), DatabaseError>;

    /// Ordered by scheduled date, then insertion.
    async fn list_scheduled(
        &self,
        user_id: Uuid,
        filter: &ScheduleFilter,
    ) -> Result<Vec<ScheduledWorkout>, DatabaseError>;
}

/// Completion history collection.
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    async fn insert_completion(&self, record: &CompletionRecord) -> Result<(), DatabaseError>;

    /// Fails with `NotFound` when nothing was deleted.
    async fn delete_completion(&self, user_id: Uuid, id: Uuid) -> Result<(), DatabaseError>;

    /// Unbounded count of the user's completions.
    async fn count_completions(&self, user_id: Uuid) -> Result<u64, DatabaseError>;

    async fn list_completions(
        &self,
        user_id: Uuid,
        filter: &CompletionFilter,
    ) -> Result<Vec<CompletionRecord>, DatabaseError>;
}

/// Read-only medal catalog.
#[async_trait]
pub trait MedalCatalog: Send + Sync {
    /// Ordered by requirement value ascending.
    async fn list_medals(&self) -> Result<Vec<MedalDefinition>, DatabaseError>;
}

/// Unlocked medal join records.
#[async_trait]
pub trait MedalRepository: Send + Sync {
    /// Newest first.
    async fn list_unlocked(&self, user_id: Uuid) -> Result<Vec<UnlockedMedal>, DatabaseError>;

    /// Fails with `Duplicate` when the (user, medal) pair already exists.
    async fn insert_unlocked(&self, unlocked: &UnlockedMedal) -> Result<(), DatabaseError>;
}

/// Read-only routine catalog.
#[async_trait]
pub trait RoutineCatalog: Send + Sync {
    async fn list_routines(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<Routine>, DatabaseError>;

    async fn get_routine(&self, id: Uuid) -> Result<Option<Routine>, DatabaseError>;
}

/// Administrator writes to the routine and exercise catalog.
#[async_trait]
pub trait RoutineRepository: RoutineCatalog {
    async fn insert_exercise(&self, exercise: &Exercise) -> Result<(), DatabaseError>;
    async fn update_exercise(&self, exercise: &Exercise) -> Result<(), DatabaseError>;
    async fn delete_exercise(&self, id: Uuid) -> Result<(), DatabaseError>;
    async fn list_exercises(&self) -> Result<Vec<Exercise>, DatabaseError>;

    /// Inserts the routine and its ordered exercise slots.
    async fn insert_routine(&self, routine: &Routine) -> Result<(), DatabaseError>;
    /// Replaces the routine row and its exercise slots.
    async fn update_routine(&self, routine: &Routine) -> Result<(), DatabaseError>;
    async fn delete_routine(&self, id: Uuid) -> Result<(), DatabaseError>;
}

/// Registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Duplicate` when the email is taken.
    async fn insert_user(&self, user: &UserProfile) -> Result<(), DatabaseError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>, DatabaseError>;

    /// Ordered by name.
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserProfile>, DatabaseError>;

    /// Fails with `NotFound` when no such user exists.
    async fn update_role(&self, id: Uuid, role: Role) -> Result<(), DatabaseError>;

    /// Removes the profile with every schedule, completion and medal record it owns.
    /// Fails with `NotFound` when no such user exists.
    async fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError>;
}
