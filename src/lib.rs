//! Pulso - Workout Schedule & Progress Engine
//!
//! Schedules routines on a calendar, records completions, derives streaks and
//! aggregate stats from the history, and unlocks achievement medals exactly
//! once per user. Administrators manage the routine catalog and user roles.
//! Persistence sits behind async repository traits with a bundled SQLite
//! implementation.

pub mod dates;
pub mod medals;
pub mod progress;
pub mod routines;
pub mod schedule;
pub mod session;
pub mod storage;
pub mod users;

// Re-export commonly used types
pub use medals::evaluator::MedalEvaluator;
pub use progress::stats::AggregateStats;
pub use routines::manager::RoutineManager;
pub use schedule::store::ScheduleStore;
pub use session::engine::SessionEngine;
pub use storage::config::AppConfig;
pub use storage::sqlite_store::SqliteStore;
pub use users::manager::UserManager;
