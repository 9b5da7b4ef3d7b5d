//! Database schema definitions for Pulso.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Exercise catalog
CREATE TABLE IF NOT EXISTS exercises (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    video_url TEXT,
    muscle_group TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Routine catalog
CREATE TABLE IF NOT EXISTS routines (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL,
    level TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL,
    calories INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Ordered exercise list per routine
CREATE TABLE IF NOT EXISTS routine_exercises (
    routine_id TEXT NOT NULL REFERENCES routines(id) ON DELETE CASCADE,
    exercise_id TEXT NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    reps TEXT,
    notes TEXT,
    PRIMARY KEY (routine_id, position)
);

-- Workouts assigned to calendar dates
CREATE TABLE IF NOT EXISTS scheduled_workouts (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    routine_id TEXT NOT NULL,
    routine_json TEXT NOT NULL,
    scheduled_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    completed_at TEXT,
    created_at TEXT NOT NULL,
    CHECK ((status = 'completed') = (completed_at IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_scheduled_user_date ON scheduled_workouts(user_id, scheduled_date);

-- Completion history
CREATE TABLE IF NOT EXISTS completed_workouts (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    routine_id TEXT NOT NULL,
    scheduled_workout_id TEXT,
    completed_date TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL,
    calories_burned INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_completed_user_date ON completed_workouts(user_id, completed_date);

-- Medal catalog
CREATE TABLE IF NOT EXISTS medals (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    icon TEXT NOT NULL,
    category TEXT NOT NULL,
    requirement_type TEXT NOT NULL,
    requirement_value INTEGER NOT NULL
);

-- Unlocked medals; the unique pair is the idempotency guard
CREATE TABLE IF NOT EXISTS user_medals (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    medal_id TEXT NOT NULL REFERENCES medals(id),
    unlocked_at TEXT NOT NULL,
    UNIQUE(user_id, medal_id)
);
"#;

/// Version 2: user profiles and roles.
pub const USERS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
    created_at TEXT NOT NULL
);
"#;

/// Schema version tracking table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;
