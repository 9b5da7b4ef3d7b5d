//! SQLite implementation of the persistence boundaries.
//!
//! Rows are read into plain `*Row` structs and validated into typed records;
//! a malformed row surfaces as `DeserializationError` instead of a default value.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::dates;
use crate::medals::{default_medals, MedalCategory, MedalDefinition, RequirementType, UnlockedMedal};
use crate::routines::{Category, Exercise, Level, MuscleGroup, Routine, RoutineExercise};
use crate::schedule::{CompletionRecord, CompletionSource, ScheduledWorkout, WorkoutStatus};
use crate::storage::database::{Database, DatabaseError};
use crate::storage::repository::{
    CompletionFilter, CompletionRepository, MedalCatalog, MedalRepository, RoutineCatalog,
    RoutineRepository, ScheduleFilter, ScheduleRepository, UserFilter, UserRepository,
};
use crate::users::{Role, UserProfile};

/// SQLite-backed store for every collection.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    /// Wrap an open database.
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open or create a store at the given path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, DatabaseError> {
        self.db
            .lock()
            .map_err(|_| DatabaseError::ConnectionFailed("database lock poisoned".to_string()))
    }

    /// Insert the default medal catalog, keeping existing entries.
    pub fn seed_default_medals(&self) -> Result<usize, DatabaseError> {
        self.seed_medals(&default_medals())
    }

    /// Insert medal definitions, keeping existing entries.
    pub fn seed_medals(&self, medals: &[MedalDefinition]) -> Result<usize, DatabaseError> {
        let db = self.lock()?;
        let mut inserted = 0;

        for medal in medals {
            inserted += db.connection().execute(
                "INSERT OR IGNORE INTO medals
                 (id, name, description, icon, category, requirement_type, requirement_value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    medal.id,
                    medal.name,
                    medal.description,
                    medal.icon,
                    medal.category.as_str(),
                    medal.requirement_type.as_str(),
                    to_sql_int(medal.requirement_value),
                ],
            )?;
        }

        if inserted > 0 {
            tracing::info!(inserted, "Seeded medal catalog");
        }
        Ok(inserted)
    }
}

// ========== Row parsing ==========

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn parse_uuid(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value)
        .map_err(|e| DatabaseError::DeserializationError(format!("invalid id '{value}': {e}")))
}

fn parse_day(value: &str) -> Result<NaiveDate, DatabaseError> {
    dates::parse_date(value).map_err(|e| DatabaseError::DeserializationError(e.to_string()))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::DeserializationError(format!("invalid timestamp '{value}': {e}")))
}

fn unknown(kind: &str, value: &str) -> DatabaseError {
    DatabaseError::DeserializationError(format!("unknown {kind} '{value}'"))
}

struct ScheduledRow {
    id: String,
    user_id: String,
    routine_json: String,
    scheduled_date: String,
    status: String,
    completed_at: Option<String>,
    created_at: String,
}

impl TryFrom<ScheduledRow> for ScheduledWorkout {
    type Error = DatabaseError;

    fn try_from(row: ScheduledRow) -> Result<Self, Self::Error> {
        let status =
            WorkoutStatus::from_str(&row.status).ok_or_else(|| unknown("status", &row.status))?;
        let completed_at = row.completed_at.as_deref().map(parse_timestamp).transpose()?;

        if (status == WorkoutStatus::Completed) != completed_at.is_some() {
            return Err(DatabaseError::DeserializationError(format!(
                "scheduled workout {} has status '{}' but completion timestamp {:?}",
                row.id, row.status, row.completed_at
            )));
        }

        Ok(ScheduledWorkout {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            routine: serde_json::from_str(&row.routine_json)
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            scheduled_date: parse_day(&row.scheduled_date)?,
            status,
            completed_at,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

struct CompletionRow {
    id: String,
    user_id: String,
    routine_id: String,
    scheduled_workout_id: Option<String>,
    completed_date: String,
    completed_at: String,
    duration_minutes: u32,
    calories_burned: u32,
}

impl TryFrom<CompletionRow> for CompletionRecord {
    type Error = DatabaseError;

    fn try_from(row: CompletionRow) -> Result<Self, Self::Error> {
        let source = match row.scheduled_workout_id.as_deref() {
            Some(id) => CompletionSource::Scheduled(parse_uuid(id)?),
            None => CompletionSource::AdHoc,
        };

        Ok(CompletionRecord {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            routine_id: parse_uuid(&row.routine_id)?,
            source,
            completed_date: parse_day(&row.completed_date)?,
            completed_at: parse_timestamp(&row.completed_at)?,
            duration_minutes: row.duration_minutes,
            calories_burned: row.calories_burned,
        })
    }
}

struct MedalRow {
    id: String,
    name: String,
    description: String,
    icon: String,
    category: String,
    requirement_type: String,
    requirement_value: i64,
}

impl TryFrom<MedalRow> for MedalDefinition {
    type Error = DatabaseError;

    fn try_from(row: MedalRow) -> Result<Self, Self::Error> {
        Ok(MedalDefinition {
            category: MedalCategory::from_str(&row.category)
                .ok_or_else(|| unknown("medal category", &row.category))?,
            requirement_type: RequirementType::from_str(&row.requirement_type)
                .ok_or_else(|| unknown("requirement type", &row.requirement_type))?,
            requirement_value: u64::try_from(row.requirement_value).map_err(|_| {
                DatabaseError::DeserializationError(format!(
                    "negative requirement for medal {}",
                    row.id
                ))
            })?,
            id: row.id,
            name: row.name,
            description: row.description,
            icon: row.icon,
        })
    }
}

struct ExerciseRow {
    id: String,
    name: String,
    description: Option<String>,
    video_url: Option<String>,
    muscle_group: String,
}

impl TryFrom<ExerciseRow> for Exercise {
    type Error = DatabaseError;

    fn try_from(row: ExerciseRow) -> Result<Self, Self::Error> {
        Ok(Exercise {
            id: parse_uuid(&row.id)?,
            muscle_group: MuscleGroup::from_str(&row.muscle_group)
                .ok_or_else(|| unknown("muscle group", &row.muscle_group))?,
            name: row.name,
            description: row.description,
            video_url: row.video_url,
        })
    }
}

struct RoutineRow {
    id: String,
    name: String,
    description: Option<String>,
    category: String,
    level: String,
    duration_minutes: u32,
    calories: u32,
    created_at: String,
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    role: String,
    created_at: String,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            id: parse_uuid(&row.id)?,
            role: Role::from_str(&row.role).ok_or_else(|| unknown("role", &row.role))?,
            created_at: parse_timestamp(&row.created_at)?,
            name: row.name,
            email: row.email,
        })
    }
}

fn read_user_row(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
    })
}

// ========== Queries ==========

const SCHEDULED_COLUMNS: &str =
    "id, user_id, routine_json, scheduled_date, status, completed_at, created_at";

const COMPLETION_COLUMNS: &str = "id, user_id, routine_id, scheduled_workout_id, completed_date,
     completed_at, duration_minutes, calories_burned";

const ROUTINE_COLUMNS: &str =
    "id, name, description, category, level, duration_minutes, calories, created_at";

fn query_scheduled(
    conn: &Connection,
    sql: &str,
    args: &[String],
) -> Result<Vec<ScheduledWorkout>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
        Ok(ScheduledRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            routine_json: row.get(2)?,
            scheduled_date: row.get(3)?,
            status: row.get(4)?,
            completed_at: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;

    let entries = rows
        .map(|row| row.map_err(DatabaseError::from).and_then(ScheduledWorkout::try_from))
        .collect();
    entries
}

fn query_completions(
    conn: &Connection,
    sql: &str,
    args: &[String],
) -> Result<Vec<CompletionRecord>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
        Ok(CompletionRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            routine_id: row.get(2)?,
            scheduled_workout_id: row.get(3)?,
            completed_date: row.get(4)?,
            completed_at: row.get(5)?,
            duration_minutes: row.get(6)?,
            calories_burned: row.get(7)?,
        })
    })?;

    let records = rows
        .map(|row| row.map_err(DatabaseError::from).and_then(CompletionRecord::try_from))
        .collect();
    records
}

fn routine_exercises(
    conn: &Connection,
    routine_id: &str,
) -> Result<Vec<RoutineExercise>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.name, e.description, e.video_url, e.muscle_group, re.reps, re.notes
         FROM routine_exercises re
         JOIN exercises e ON e.id = re.exercise_id
         WHERE re.routine_id = ?1
         ORDER BY re.position ASC",
    )?;
    let rows = stmt.query_map(params![routine_id], |row| {
        Ok((
            ExerciseRow {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                video_url: row.get(3)?,
                muscle_group: row.get(4)?,
            },
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
        ))
    })?;

    let slots = rows
        .map(|row| -> Result<RoutineExercise, DatabaseError> {
            let (exercise, reps, notes) = row?;
            Ok(RoutineExercise {
                exercise: Exercise::try_from(exercise)?,
                reps,
                notes,
            })
        })
        .collect();
    slots
}

fn build_routine(conn: &Connection, row: RoutineRow) -> Result<Routine, DatabaseError> {
    let exercises = routine_exercises(conn, &row.id)?;
    Ok(Routine {
        id: parse_uuid(&row.id)?,
        category: Category::from_str(&row.category)
            .ok_or_else(|| unknown("category", &row.category))?,
        level: Level::from_str(&row.level).ok_or_else(|| unknown("level", &row.level))?,
        created_at: parse_timestamp(&row.created_at)?,
        name: row.name,
        description: row.description,
        duration_minutes: row.duration_minutes,
        calories: row.calories,
        exercises,
    })
}

fn read_routine_row(row: &rusqlite::Row) -> rusqlite::Result<RoutineRow> {
    Ok(RoutineRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        level: row.get(4)?,
        duration_minutes: row.get(5)?,
        calories: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn insert_routine_slots(conn: &Connection, routine: &Routine) -> Result<(), DatabaseError> {
    for (index, slot) in routine.exercises.iter().enumerate() {
        conn.execute(
            "INSERT INTO routine_exercises (routine_id, exercise_id, position, reps, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                routine.id.to_string(),
                slot.exercise.id.to_string(),
                index as u32 + 1,
                slot.reps,
                slot.notes,
            ],
        )?;
    }
    Ok(())
}

fn expect_changed(changed: usize, what: &str, id: impl std::fmt::Display) -> Result<(), DatabaseError> {
    if changed == 0 {
        Err(DatabaseError::NotFound(format!("{what} {id}")))
    } else {
        Ok(())
    }
}

// ========== Scheduled workouts ==========

#[async_trait]
impl ScheduleRepository for SqliteStore {
    async fn insert_scheduled(&self, entry: &ScheduledWorkout) -> Result<(), DatabaseError> {
        let routine_json = serde_json::to_string(&entry.routine)?;
        let db = self.lock()?;

        db.connection().execute(
            "INSERT INTO scheduled_workouts
             (id, user_id, routine_id, routine_json, scheduled_date, status, completed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id.to_string(),
                entry.user_id.to_string(),
                entry.routine_id().to_string(),
                routine_json,
                dates::format_date(entry.scheduled_date),
                entry.status.as_str(),
                entry.completed_at.map(|t| t.to_rfc3339()),
                entry.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn update_scheduled(&self, entry: &ScheduledWorkout) -> Result<(), DatabaseError> {
        let routine_json = serde_json::to_string(&entry.routine)?;
        let db = self.lock()?;

        let changed = db.connection().execute(
            "UPDATE scheduled_workouts
             SET routine_json = ?1, scheduled_date = ?2, status = ?3, completed_at = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![
                routine_json,
                dates::format_date(entry.scheduled_date),
                entry.status.as_str(),
                entry.completed_at.map(|t| t.to_rfc3339()),
                entry.id.to_string(),
                entry.user_id.to_string(),
            ],
        )?;

        expect_changed(changed, "scheduled workout", entry.id)
    }

    async fn delete_scheduled(&self, user_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let db = self.lock()?;
        let changed = db.connection().execute(
            "DELETE FROM scheduled_workouts WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
        )?;

        expect_changed(changed, "scheduled workout", id)
    }

    async fn list_scheduled(
        &self,
        user_id: Uuid,
        filter: &ScheduleFilter,
    ) -> Result<Vec<ScheduledWorkout>, DatabaseError> {
        let mut sql = format!("SELECT {SCHEDULED_COLUMNS} FROM scheduled_workouts WHERE user_id = ?");
        let mut args = vec![user_id.to_string()];

        if let Some(from) = filter.from {
            sql.push_str(" AND scheduled_date >= ?");
            args.push(dates::format_date(from));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND scheduled_date <= ?");
            args.push(dates::format_date(to));
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            args.push(status.as_str().to_string());
        }
        sql.push_str(" ORDER BY scheduled_date ASC, rowid ASC");

        let db = self.lock()?;
        query_scheduled(db.connection(), &sql, &args)
    }
}

// ========== Completion history ==========

#[async_trait]
impl CompletionRepository for SqliteStore {
    async fn insert_completion(&self, record: &CompletionRecord) -> Result<(), DatabaseError> {
        let db = self.lock()?;

        db.connection().execute(
            "INSERT INTO completed_workouts
             (id, user_id, routine_id, scheduled_workout_id, completed_date, completed_at,
              duration_minutes, calories_burned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id.to_string(),
                record.user_id.to_string(),
                record.routine_id.to_string(),
                record.source.scheduled_workout_id().map(|id| id.to_string()),
                dates::format_date(record.completed_date),
                record.completed_at.to_rfc3339(),
                record.duration_minutes,
                record.calories_burned,
            ],
        )?;

        Ok(())
    }

    async fn delete_completion(&self, user_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let db = self.lock()?;
        let changed = db.connection().execute(
            "DELETE FROM completed_workouts WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
        )?;

        expect_changed(changed, "completion", id)
    }

    async fn count_completions(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let db = self.lock()?;
        let count: i64 = db.connection().query_row(
            "SELECT COUNT(*) FROM completed_workouts WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn list_completions(
        &self,
        user_id: Uuid,
        filter: &CompletionFilter,
    ) -> Result<Vec<CompletionRecord>, DatabaseError> {
        let mut sql = format!("SELECT {COMPLETION_COLUMNS} FROM completed_workouts WHERE user_id = ?");
        let mut args = vec![user_id.to_string()];

        if let Some(since) = filter.since {
            sql.push_str(" AND completed_date >= ?");
            args.push(dates::format_date(since));
        }
        if let Some(until) = filter.until {
            sql.push_str(" AND completed_date <= ?");
            args.push(dates::format_date(until));
        }
        sql.push_str(" ORDER BY completed_date DESC, completed_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let db = self.lock()?;
        query_completions(db.connection(), &sql, &args)
    }
}

// ========== Medals ==========

#[async_trait]
impl MedalCatalog for SqliteStore {
    async fn list_medals(&self) -> Result<Vec<MedalDefinition>, DatabaseError> {
        let db = self.lock()?;
        let mut stmt = db.connection().prepare(
            "SELECT id, name, description, icon, category, requirement_type, requirement_value
             FROM medals
             ORDER BY requirement_value ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(MedalRow {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                icon: row.get(3)?,
                category: row.get(4)?,
                requirement_type: row.get(5)?,
                requirement_value: row.get(6)?,
            })
        })?;

        let medals = rows
            .map(|row| row.map_err(DatabaseError::from).and_then(MedalDefinition::try_from))
            .collect();
        medals
    }
}

#[async_trait]
impl MedalRepository for SqliteStore {
    async fn list_unlocked(&self, user_id: Uuid) -> Result<Vec<UnlockedMedal>, DatabaseError> {
        let db = self.lock()?;
        let mut stmt = db.connection().prepare(
            "SELECT id, user_id, medal_id, unlocked_at
             FROM user_medals
             WHERE user_id = ?1
             ORDER BY unlocked_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let unlocked = rows
            .map(|row| -> Result<UnlockedMedal, DatabaseError> {
                let (id, user_id, medal_id, unlocked_at) = row?;
                Ok(UnlockedMedal {
                    id: parse_uuid(&id)?,
                    user_id: parse_uuid(&user_id)?,
                    medal_id,
                    unlocked_at: parse_timestamp(&unlocked_at)?,
                })
            })
            .collect();
        unlocked
    }

    async fn insert_unlocked(&self, unlocked: &UnlockedMedal) -> Result<(), DatabaseError> {
        let db = self.lock()?;
        db.connection().execute(
            "INSERT INTO user_medals (id, user_id, medal_id, unlocked_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                unlocked.id.to_string(),
                unlocked.user_id.to_string(),
                unlocked.medal_id,
                unlocked.unlocked_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }
}

// ========== Routines ==========

#[async_trait]
impl RoutineCatalog for SqliteStore {
    async fn list_routines(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<Routine>, DatabaseError> {
        let db = self.lock()?;
        let conn = db.connection();

        let mut sql = format!("SELECT {ROUTINE_COLUMNS} FROM routines");
        let mut args = Vec::new();
        if let Some(category) = category {
            sql.push_str(" WHERE category = ?");
            args.push(category.as_str().to_string());
        }
        sql.push_str(" ORDER BY name ASC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), read_routine_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(|row| build_routine(conn, row)).collect()
    }

    async fn get_routine(&self, id: Uuid) -> Result<Option<Routine>, DatabaseError> {
        let db = self.lock()?;
        let conn = db.connection();

        let row = conn
            .query_row(
                &format!("SELECT {ROUTINE_COLUMNS} FROM routines WHERE id = ?1"),
                params![id.to_string()],
                read_routine_row,
            )
            .optional()?;

        row.map(|row| build_routine(conn, row)).transpose()
    }
}

#[async_trait]
impl RoutineRepository for SqliteStore {
    async fn insert_exercise(&self, exercise: &Exercise) -> Result<(), DatabaseError> {
        let db = self.lock()?;
        db.connection().execute(
            "INSERT INTO exercises (id, name, description, video_url, muscle_group, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                exercise.id.to_string(),
                exercise.name,
                exercise.description,
                exercise.video_url,
                exercise.muscle_group.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn update_exercise(&self, exercise: &Exercise) -> Result<(), DatabaseError> {
        let db = self.lock()?;
        let changed = db.connection().execute(
            "UPDATE exercises SET name = ?1, description = ?2, video_url = ?3, muscle_group = ?4
             WHERE id = ?5",
            params![
                exercise.name,
                exercise.description,
                exercise.video_url,
                exercise.muscle_group.as_str(),
                exercise.id.to_string(),
            ],
        )?;
        expect_changed(changed, "exercise", exercise.id)
    }

    async fn delete_exercise(&self, id: Uuid) -> Result<(), DatabaseError> {
        let db = self.lock()?;
        let changed = db
            .connection()
            .execute("DELETE FROM exercises WHERE id = ?1", params![id.to_string()])?;
        expect_changed(changed, "exercise", id)
    }

    async fn list_exercises(&self) -> Result<Vec<Exercise>, DatabaseError> {
        let db = self.lock()?;
        let mut stmt = db.connection().prepare(
            "SELECT id, name, description, video_url, muscle_group FROM exercises ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ExerciseRow {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                video_url: row.get(3)?,
                muscle_group: row.get(4)?,
            })
        })?;

        let exercises = rows
            .map(|row| row.map_err(DatabaseError::from).and_then(Exercise::try_from))
            .collect();
        exercises
    }

    async fn insert_routine(&self, routine: &Routine) -> Result<(), DatabaseError> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;

        tx.execute(
            "INSERT INTO routines
             (id, name, description, category, level, duration_minutes, calories, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                routine.id.to_string(),
                routine.name,
                routine.description,
                routine.category.as_str(),
                routine.level.as_str(),
                routine.duration_minutes,
                routine.calories,
                routine.created_at.to_rfc3339(),
            ],
        )?;
        insert_routine_slots(&tx, routine)?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    async fn update_routine(&self, routine: &Routine) -> Result<(), DatabaseError> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;

        let changed = tx.execute(
            "UPDATE routines
             SET name = ?1, description = ?2, category = ?3, level = ?4,
                 duration_minutes = ?5, calories = ?6
             WHERE id = ?7",
            params![
                routine.name,
                routine.description,
                routine.category.as_str(),
                routine.level.as_str(),
                routine.duration_minutes,
                routine.calories,
                routine.id.to_string(),
            ],
        )?;
        expect_changed(changed, "routine", routine.id)?;

        tx.execute(
            "DELETE FROM routine_exercises WHERE routine_id = ?1",
            params![routine.id.to_string()],
        )?;
        insert_routine_slots(&tx, routine)?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    async fn delete_routine(&self, id: Uuid) -> Result<(), DatabaseError> {
        let db = self.lock()?;
        let changed = db
            .connection()
            .execute("DELETE FROM routines WHERE id = ?1", params![id.to_string()])?;
        expect_changed(changed, "routine", id)
    }
}

// ========== Users ==========

#[async_trait]
impl UserRepository for SqliteStore {
    async fn insert_user(&self, user: &UserProfile) -> Result<(), DatabaseError> {
        let db = self.lock()?;
        db.connection().execute(
            "INSERT INTO users (id, name, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.role.as_str(),
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>, DatabaseError> {
        let db = self.lock()?;
        let row = db
            .connection()
            .query_row(
                "SELECT id, name, email, role, created_at FROM users WHERE id = ?1",
                params![id.to_string()],
                read_user_row,
            )
            .optional()?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserProfile>, DatabaseError> {
        let db = self.lock()?;

        let mut sql = "SELECT id, name, email, role, created_at FROM users WHERE 1 = 1".to_string();
        let mut args = Vec::new();
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(" AND (instr(lower(name), ?) > 0 OR instr(lower(email), ?) > 0)");
            let needle = search.to_lowercase();
            args.push(needle.clone());
            args.push(needle);
        }
        if let Some(role) = filter.role {
            sql.push_str(" AND role = ?");
            args.push(role.as_str().to_string());
        }
        sql.push_str(" ORDER BY name ASC, email ASC");

        let mut stmt = db.connection().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), read_user_row)?;

        let users = rows
            .map(|row| row.map_err(DatabaseError::from).and_then(UserProfile::try_from))
            .collect();
        users
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<(), DatabaseError> {
        let db = self.lock()?;
        let changed = db.connection().execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.as_str(), id.to_string()],
        )?;
        expect_changed(changed, "user", id)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;
        let user_id = id.to_string();

        for table in ["user_medals", "completed_workouts", "scheduled_workouts"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE user_id = ?1"),
                params![user_id],
            )?;
        }
        let changed = tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        expect_changed(changed, "user", id)?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Effort, RoutineSummary};
    use chrono::Duration;

    fn summary(name: &str) -> RoutineSummary {
        RoutineSummary {
            routine_id: Uuid::new_v4(),
            name: name.to_string(),
            category: "running".to_string(),
            duration_minutes: 30,
            calories: 250,
            exercises: vec!["Intervals".to_string()],
        }
    }

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 10).unwrap() + Duration::days(offset)
    }

    #[tokio::test]
    async fn test_scheduled_insert_and_list_in_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = Uuid::new_v4();

        let late = ScheduledWorkout::new(user, summary("Late"), day(2));
        let first = ScheduledWorkout::new(user, summary("First"), day(0));
        let second = ScheduledWorkout::new(user, summary("Second"), day(0));
        for entry in [&late, &first, &second] {
            store.insert_scheduled(entry).await.unwrap();
        }

        let all = store.list_scheduled(user, &ScheduleFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|e| e.routine.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Late"]);

        let on_day = store.list_scheduled(user, &ScheduleFilter::on(day(0))).await.unwrap();
        assert_eq!(on_day.len(), 2);
        assert_eq!(on_day[0], first);
    }

    #[tokio::test]
    async fn test_scheduled_is_scoped_by_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let entry = ScheduledWorkout::new(owner, summary("Mine"), day(0));
        store.insert_scheduled(&entry).await.unwrap();

        assert!(store
            .list_scheduled(other, &ScheduleFilter::default())
            .await
            .unwrap()
            .is_empty());

        let err = store.delete_scheduled(other, entry.id).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete_scheduled() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        let mut entry = ScheduledWorkout::new(user, summary("Run"), day(0));
        store.insert_scheduled(&entry).await.unwrap();

        entry.mark_completed(Utc::now());
        store.update_scheduled(&entry).await.unwrap();

        let completed = store
            .list_scheduled(
                user,
                &ScheduleFilter {
                    status: Some(WorkoutStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert!(completed[0].completed_at.is_some());

        store.delete_scheduled(user, entry.id).await.unwrap();
        let err = store.update_scheduled(&entry).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_completions_window_and_count() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        let routine = Uuid::new_v4();
        let effort = Effort {
            duration_minutes: 20,
            calories_burned: 100,
        };

        for offset in 0..5 {
            let mut record = CompletionRecord::ad_hoc(user, routine, effort, Utc::now());
            record.completed_date = day(offset);
            store.insert_completion(&record).await.unwrap();
        }

        assert_eq!(store.count_completions(user).await.unwrap(), 5);

        let window = store
            .list_completions(
                user,
                &CompletionFilter {
                    since: Some(day(2)),
                    until: None,
                    limit: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].completed_date, day(4));
        assert_eq!(window[1].completed_date, day(3));
    }

    #[tokio::test]
    async fn test_unlocked_medal_uniqueness() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_default_medals().unwrap();
        assert_eq!(store.seed_default_medals().unwrap(), 0);

        let user = Uuid::new_v4();
        store
            .insert_unlocked(&UnlockedMedal::new(user, "first_workout"))
            .await
            .unwrap();
        let err = store
            .insert_unlocked(&UnlockedMedal::new(user, "first_workout"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Duplicate(_)));
        assert_eq!(store.list_unlocked(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_medal_catalog_ordered_by_threshold() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_default_medals().unwrap();

        let medals = store.list_medals().await.unwrap();
        assert_eq!(medals.len(), default_medals().len());
        assert!(medals
            .windows(2)
            .all(|pair| pair[0].requirement_value <= pair[1].requirement_value));
    }

    #[tokio::test]
    async fn test_malformed_row_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        {
            let db = store.lock().unwrap();
            db.connection()
                .execute(
                    "INSERT INTO scheduled_workouts
                     (id, user_id, routine_id, routine_json, scheduled_date, status, completed_at, created_at)
                     VALUES (?1, ?2, 'r', '{}', 'not-a-date', 'pending', NULL, ?3)",
                    params![Uuid::new_v4().to_string(), user.to_string(), Utc::now().to_rfc3339()],
                )
                .unwrap();
        }

        let err = store
            .list_scheduled(user, &ScheduleFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::DeserializationError(_)));
    }

    #[tokio::test]
    async fn test_routine_round_trip_with_exercises() {
        let store = SqliteStore::open_in_memory().unwrap();
        let squat = Exercise::new("Squats".to_string(), MuscleGroup::Legs);
        let plank = Exercise::new("Plank".to_string(), MuscleGroup::Core);
        store.insert_exercise(&squat).await.unwrap();
        store.insert_exercise(&plank).await.unwrap();

        let mut routine = Routine::new("Core & Legs".to_string(), Category::Strength, Level::Beginner, 30);
        routine.exercises = vec![
            RoutineExercise {
                exercise: plank.clone(),
                reps: Some("3x45s".to_string()),
                notes: None,
            },
            RoutineExercise {
                exercise: squat.clone(),
                reps: Some("4x12".to_string()),
                notes: Some("Slow descent".to_string()),
            },
        ];
        store.insert_routine(&routine).await.unwrap();

        let loaded = store.get_routine(routine.id).await.unwrap().unwrap();
        assert_eq!(loaded.exercises.len(), 2);
        assert_eq!(loaded.exercises[0].exercise.name, "Plank");
        assert_eq!(loaded.exercises[1].notes.as_deref(), Some("Slow descent"));

        routine.exercises.truncate(1);
        store.update_routine(&routine).await.unwrap();
        let loaded = store.get_routine(routine.id).await.unwrap().unwrap();
        assert_eq!(loaded.exercises.len(), 1);

        assert_eq!(store.list_routines(Some(Category::Running)).await.unwrap().len(), 0);
        assert_eq!(store.list_routines(None).await.unwrap().len(), 1);

        store.delete_routine(routine.id).await.unwrap();
        assert!(store.get_routine(routine.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_users_search_and_role_filter() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ana = UserProfile::new("Ana Ruiz".to_string(), "ana@example.com".to_string(), Role::Admin);
        let bo = UserProfile::new("Bo".to_string(), "bo@gym.io".to_string(), Role::User);
        store.insert_user(&bo).await.unwrap();
        store.insert_user(&ana).await.unwrap();

        let all = store.list_users(&UserFilter::default()).await.unwrap();
        assert_eq!(all, vec![ana.clone(), bo.clone()]);

        let search = UserFilter {
            search: Some("GYM".to_string()),
            role: None,
        };
        assert_eq!(store.list_users(&search).await.unwrap(), vec![bo.clone()]);

        let admins = UserFilter {
            search: None,
            role: Some(Role::Admin),
        };
        assert_eq!(store.list_users(&admins).await.unwrap(), vec![ana.clone()]);

        let twin = UserProfile::new("Ana Two".to_string(), "ana@example.com".to_string(), Role::User);
        assert!(matches!(
            store.insert_user(&twin).await,
            Err(DatabaseError::Duplicate(_))
        ));

        store.update_role(bo.id, Role::Admin).await.unwrap();
        assert_eq!(store.get_user(bo.id).await.unwrap().unwrap().role, Role::Admin);
        assert!(matches!(
            store.update_role(Uuid::new_v4(), Role::User).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_user_removes_owned_records() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_default_medals().unwrap();
        let gone = UserProfile::new("Gone".to_string(), "gone@example.com".to_string(), Role::User);
        let kept = UserProfile::new("Kept".to_string(), "kept@example.com".to_string(), Role::User);
        store.insert_user(&gone).await.unwrap();
        store.insert_user(&kept).await.unwrap();

        for user in [gone.id, kept.id] {
            let mut entry = ScheduledWorkout::new(user, summary("Run"), day(0));
            entry.mark_completed(Utc::now());
            store.insert_scheduled(&entry).await.unwrap();
            store
                .insert_completion(&CompletionRecord::for_entry(
                    &entry,
                    Effort {
                        duration_minutes: 30,
                        calories_burned: 250,
                    },
                    Utc::now(),
                ))
                .await
                .unwrap();
            store
                .insert_unlocked(&UnlockedMedal::new(user, "first_workout"))
                .await
                .unwrap();
        }

        store.delete_user(gone.id).await.unwrap();
        assert!(store.get_user(gone.id).await.unwrap().is_none());
        assert!(store
            .list_scheduled(gone.id, &ScheduleFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.count_completions(gone.id).await.unwrap(), 0);
        assert!(store.list_unlocked(gone.id).await.unwrap().is_empty());

        assert_eq!(store.count_completions(kept.id).await.unwrap(), 1);
        assert_eq!(store.list_unlocked(kept.id).await.unwrap().len(), 1);
        assert!(matches!(
            store.delete_user(gone.id).await,
            Err(DatabaseError::NotFound(_))
        ));
    }
}
