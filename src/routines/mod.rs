//! Routine catalog.
//!
//! Routines are named, categorized workouts with an ordered exercise list.
//! Administrators manage them through `RoutineManager`.

pub mod manager;
pub mod types;

pub use manager::{RoutineError, RoutineManager};
pub use types::{Category, Exercise, Level, MuscleGroup, Routine, RoutineExercise};
