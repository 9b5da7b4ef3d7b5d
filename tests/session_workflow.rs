//! Integration tests for running a scheduled routine as a live session.

use pulso::routines::{Category, Exercise, Level, MuscleGroup, Routine, RoutineExercise};
use pulso::schedule::WorkoutStatus;
use pulso::storage::{SessionSettings, StatsSettings};
use pulso::{RoutineManager, ScheduleStore, SessionEngine, SqliteStore};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_session_effort_feeds_completion() {
    let sqlite = Arc::new(SqliteStore::open_in_memory().unwrap());
    sqlite.seed_default_medals().unwrap();
    let routines = RoutineManager::new(sqlite.clone());

    let mut routine = Routine::new(
        "Upper Body".to_string(),
        Category::Strength,
        Level::Intermediate,
        40,
    );
    routine.calories = 280;
    for (name, group) in [("Bench Press", MuscleGroup::Chest), ("Rows", MuscleGroup::Back)] {
        let exercise = Exercise::new(name.to_string(), group);
        routines.create_exercise(&exercise).await.unwrap();
        routine.exercises.push(RoutineExercise {
            exercise,
            reps: Some("4x8".to_string()),
            notes: None,
        });
    }
    routines.create_routine(&routine).await.unwrap();

    let loaded = routines.get_routine(routine.id).await.unwrap().unwrap();
    let mut store = ScheduleStore::open_sqlite(Uuid::new_v4(), sqlite.clone(), StatsSettings::default())
        .await
        .unwrap();
    let entry = store
        .schedule(loaded.summary(), pulso::dates::today_local())
        .await
        .unwrap();
    assert_eq!(entry.routine.exercises, vec!["Bench Press", "Rows"]);

    let mut session = SessionEngine::new(&SessionSettings::default());
    session.load(entry.routine.clone());
    session.start().unwrap();
    for _ in 0..(25 * 60) {
        session.tick();
    }
    assert!(session.next_exercise().unwrap());
    for _ in 0..(5 * 60) {
        session.tick();
    }
    assert_eq!(session.format_elapsed(), "30:00");
    let effort = session.finish().unwrap();

    let outcome = store.complete(entry.id, Some(effort)).await.unwrap();
    assert_eq!(outcome.entry.status, WorkoutStatus::Completed);
    assert_eq!(outcome.record.duration_minutes, 30);
    assert_eq!(outcome.record.calories_burned, 240);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_minutes, 30);
    assert_eq!(stats.this_week_completed, 1);

    // Deleting the routine leaves the scheduled copy intact.
    routines.delete_routine(routine.id).await.unwrap();
    store.refresh().await.unwrap();
    assert_eq!(store.entries()[0].routine.name, "Upper Body");
}
