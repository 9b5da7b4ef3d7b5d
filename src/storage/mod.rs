//! Storage module for database, repositories and configuration.

pub mod config;
pub mod database;
pub mod repository;
pub mod schema;
pub mod sqlite_store;

pub use config::{AppConfig, ConfigError, SessionSettings, StatsSettings, UserSettings};
pub use database::{Database, DatabaseError};
pub use repository::{
    CompletionFilter, CompletionRepository, MedalCatalog, MedalRepository, RoutineCatalog,
    RoutineRepository, ScheduleFilter, ScheduleRepository, UserFilter, UserRepository,
};
pub use sqlite_store::SqliteStore;
