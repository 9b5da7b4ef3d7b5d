//! In-memory view of one user's schedule, backed by the repositories.
//!
//! Mutations hit persistence first and only then update the local collection,
//! so a failed call never advances in-memory state.

use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::dates::{self, DateError};
use crate::medals::{EarnedMedal, MedalEvaluator};
use crate::progress::{self, AggregateStats, MonthlyTotals};
use crate::schedule::types::{CompletionRecord, Effort, RoutineSummary, ScheduledWorkout};
use crate::storage::config::StatsSettings;
use crate::storage::database::DatabaseError;
use crate::storage::repository::{
    CompletionFilter, CompletionRepository, ScheduleFilter, ScheduleRepository,
};
use crate::storage::sqlite_store::SqliteStore;

/// Result of completing a workout.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    /// The entry, now completed
    pub entry: ScheduledWorkout,
    /// History record emitted for the completion
    pub record: CompletionRecord,
    /// Medals unlocked by the evaluation that followed
    pub unlocked: Vec<EarnedMedal>,
}

/// Schedule store for a single user.
pub struct ScheduleStore {
    user_id: Uuid,
    schedule: Arc<dyn ScheduleRepository>,
    completions: Arc<dyn CompletionRepository>,
    evaluator: MedalEvaluator,
    settings: StatsSettings,
    entries: Vec<ScheduledWorkout>,
}

impl ScheduleStore {
    /// Create an empty store. Call `refresh` to load persisted entries.
    pub fn new(
        user_id: Uuid,
        schedule: Arc<dyn ScheduleRepository>,
        completions: Arc<dyn CompletionRepository>,
        evaluator: MedalEvaluator,
        settings: StatsSettings,
    ) -> Self {
        Self {
            user_id,
            schedule,
            completions,
            evaluator,
            settings,
            entries: Vec::new(),
        }
    }

    /// Create a store and load the user's entries.
    pub async fn open(
        user_id: Uuid,
        schedule: Arc<dyn ScheduleRepository>,
        completions: Arc<dyn CompletionRepository>,
        evaluator: MedalEvaluator,
        settings: StatsSettings,
    ) -> Result<Self, ScheduleError> {
        let mut store = Self::new(user_id, schedule, completions, evaluator, settings);
        store.refresh().await?;
        Ok(store)
    }

    /// Open a store whose every collection lives in one SQLite store.
    pub async fn open_sqlite(
        user_id: Uuid,
        sqlite: Arc<SqliteStore>,
        settings: StatsSettings,
    ) -> Result<Self, ScheduleError> {
        let evaluator = MedalEvaluator::new(
            sqlite.clone(),
            sqlite.clone(),
            sqlite.clone(),
            settings.clone(),
        );
        Self::open(user_id, sqlite.clone(), sqlite, evaluator, settings).await
    }

    /// Owning user.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Medal evaluator used after completions.
    pub fn evaluator(&self) -> &MedalEvaluator {
        &self.evaluator
    }

    /// Every loaded entry.
    pub fn entries(&self) -> &[ScheduledWorkout] {
        &self.entries
    }

    /// Reload the collection from persistence, replacing in-memory state.
    pub async fn refresh(&mut self) -> Result<(), ScheduleError> {
        let entries = self
            .schedule
            .list_scheduled(self.user_id, &ScheduleFilter::default())
            .await?;

        tracing::debug!(user_id = %self.user_id, count = entries.len(), "Refreshed schedule");
        self.entries = entries;
        Ok(())
    }

    /// Schedule a routine on a date.
    pub async fn schedule(
        &mut self,
        routine: RoutineSummary,
        date: NaiveDate,
    ) -> Result<ScheduledWorkout, ScheduleError> {
        validate_routine(&routine)?;

        let entry = ScheduledWorkout::new(self.user_id, routine, date);
        self.schedule.insert_scheduled(&entry).await?;

        tracing::info!(
            id = %entry.id,
            routine = %entry.routine.name,
            date = %entry.scheduled_date,
            "Scheduled workout"
        );
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Schedule a routine on a `YYYY-MM-DD` date.
    pub async fn schedule_str(
        &mut self,
        routine: RoutineSummary,
        date: &str,
    ) -> Result<ScheduledWorkout, ScheduleError> {
        let date = dates::parse_date(date)?;
        self.schedule(routine, date).await
    }

    /// Complete a pending entry, record it and evaluate medals.
    ///
    /// `effort` defaults to the routine's planned duration and calories.
    pub async fn complete(
        &mut self,
        id: Uuid,
        effort: Option<Effort>,
    ) -> Result<CompletionOutcome, ScheduleError> {
        let index = self.position(id)?;
        if self.entries[index].is_completed() {
            return Err(ScheduleError::AlreadyCompleted(id));
        }

        let now = Utc::now();
        let previous = self.entries[index].clone();
        let mut entry = previous.clone();
        entry.mark_completed(now);
        self.persist_update(index, &entry).await?;

        let effort = effort.unwrap_or_else(|| Effort::estimated(&entry.routine));
        let record = CompletionRecord::for_entry(&entry, effort, now);
        if let Err(e) = self.completions.insert_completion(&record).await {
            // No record was written; the entry goes back to pending.
            if let Err(revert) = self.schedule.update_scheduled(&previous).await {
                tracing::error!(id = %id, error = %revert, "Failed to revert completed workout");
            }
            self.entries[index] = previous;
            return Err(e.into());
        }

        tracing::info!(
            id = %entry.id,
            routine = %entry.routine.name,
            minutes = record.duration_minutes,
            "Completed workout"
        );

        let unlocked = self.evaluator.evaluate(self.user_id).await;
        Ok(CompletionOutcome {
            entry,
            record,
            unlocked,
        })
    }

    /// Mark a routine done today without a prior schedule.
    pub async fn complete_ad_hoc(
        &mut self,
        routine: RoutineSummary,
        effort: Option<Effort>,
    ) -> Result<CompletionOutcome, ScheduleError> {
        validate_routine(&routine)?;

        let now = Utc::now();
        let mut entry = ScheduledWorkout::new(self.user_id, routine, dates::local_date_of(now));
        entry.mark_completed(now);
        self.schedule.insert_scheduled(&entry).await?;

        let effort = effort.unwrap_or_else(|| Effort::estimated(&entry.routine));
        let record = CompletionRecord::ad_hoc(self.user_id, entry.routine_id(), effort, now);
        if let Err(e) = self.completions.insert_completion(&record).await {
            if let Err(revert) = self.schedule.delete_scheduled(self.user_id, entry.id).await {
                tracing::error!(id = %entry.id, error = %revert, "Failed to revert ad-hoc workout");
            }
            return Err(e.into());
        }
        self.entries.push(entry.clone());

        tracing::info!(
            id = %entry.id,
            routine = %entry.routine.name,
            minutes = record.duration_minutes,
            "Completed ad-hoc workout"
        );

        let unlocked = self.evaluator.evaluate(self.user_id).await;
        Ok(CompletionOutcome {
            entry,
            record,
            unlocked,
        })
    }

    /// Move an entry to a new date. Resets it to pending.
    pub async fn reschedule(
        &mut self,
        id: Uuid,
        date: NaiveDate,
    ) -> Result<ScheduledWorkout, ScheduleError> {
        let index = self.position(id)?;

        let mut entry = self.entries[index].clone();
        let previous = entry.scheduled_date;
        entry.reschedule_to(date);
        self.persist_update(index, &entry).await?;

        tracing::info!(id = %id, from = %previous, to = %date, "Rescheduled workout");
        Ok(entry)
    }

    /// Delete an entry. Removing an unknown entry succeeds.
    pub async fn remove(&mut self, id: Uuid) -> Result<(), ScheduleError> {
        match self.schedule.delete_scheduled(self.user_id, id).await {
            Ok(()) => tracing::info!(id = %id, "Removed scheduled workout"),
            Err(DatabaseError::NotFound(_)) => {
                tracing::debug!(id = %id, "Scheduled workout already removed");
            }
            Err(e) => return Err(e.into()),
        }

        self.entries.retain(|e| e.id != id);
        Ok(())
    }

    /// Delete a completion record. Removing an unknown record succeeds.
    pub async fn remove_completion(&mut self, record_id: Uuid) -> Result<(), ScheduleError> {
        match self
            .completions
            .delete_completion(self.user_id, record_id)
            .await
        {
            Ok(()) => {
                tracing::info!(id = %record_id, "Removed completion record");
                Ok(())
            }
            Err(DatabaseError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Entries on a date, in insertion order, regardless of status.
    pub fn entries_for_date(&self, date: NaiveDate) -> Vec<&ScheduledWorkout> {
        self.entries
            .iter()
            .filter(|e| e.scheduled_date == date)
            .collect()
    }

    /// Entries in an inclusive date range, ordered by date then insertion.
    pub fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<&ScheduledWorkout> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.scheduled_date >= from && e.scheduled_date <= to)
            .collect();
        entries.sort_by_key(|e| e.scheduled_date);
        entries
    }

    /// Pending entries scheduled on or before `today`.
    pub fn pending_due_count(&self, today: NaiveDate) -> usize {
        self.entries
            .iter()
            .filter(|e| !e.is_completed() && e.scheduled_date <= today)
            .count()
    }

    /// Aggregate stats over the configured window.
    pub async fn stats(&self) -> Result<AggregateStats, ScheduleError> {
        let stats = progress::load_stats(
            self.completions.as_ref(),
            self.user_id,
            &self.settings,
            dates::now_local(),
        )
        .await?;
        Ok(stats)
    }

    /// Totals over every completion in a calendar month.
    pub async fn monthly_stats(&self, year: i32, month: u32) -> Result<MonthlyTotals, ScheduleError> {
        let (first, last) = dates::month_bounds(year, month)
            .ok_or_else(|| ScheduleError::Validation(format!("invalid month {year}-{month}")))?;

        let records = self
            .completions
            .list_completions(self.user_id, &CompletionFilter::between(first, last))
            .await?;
        Ok(progress::monthly_totals(&records))
    }

    /// Completion count per date in an inclusive range.
    pub async fn activity_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, u32>, ScheduleError> {
        let records = self
            .completions
            .list_completions(self.user_id, &CompletionFilter::between(from, to))
            .await?;
        Ok(progress::activity_by_date(&records))
    }

    fn position(&self, id: Uuid) -> Result<usize, ScheduleError> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(ScheduleError::NotFound(id))
    }

    /// Write an updated entry and replace it locally. A missing row drops the stale entry.
    async fn persist_update(
        &mut self,
        index: usize,
        entry: &ScheduledWorkout,
    ) -> Result<(), ScheduleError> {
        match self.schedule.update_scheduled(entry).await {
            Ok(()) => {
                self.entries[index] = entry.clone();
                Ok(())
            }
            Err(DatabaseError::NotFound(_)) => {
                tracing::warn!(id = %entry.id, "Scheduled workout vanished from storage");
                self.entries.remove(index);
                Err(ScheduleError::NotFound(entry.id))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_routine(routine: &RoutineSummary) -> Result<(), ScheduleError> {
    if routine.name.trim().is_empty() {
        return Err(ScheduleError::Validation(
            "Routine name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Schedule errors.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Scheduled workout not found: {0}")]
    NotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scheduled workout already completed: {0}")]
    AlreadyCompleted(Uuid),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),
}

impl From<DateError> for ScheduleError {
    fn from(e: DateError) -> Self {
        ScheduleError::Validation(e.to_string())
    }
}
