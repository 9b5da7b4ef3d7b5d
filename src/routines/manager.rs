//! Routine and exercise catalog administration.

use std::sync::Arc;
use uuid::Uuid;

use super::types::{Category, Exercise, Routine};
use crate::storage::database::DatabaseError;
use crate::storage::repository::RoutineRepository;

/// Manager for the routine catalog.
pub struct RoutineManager {
    repo: Arc<dyn RoutineRepository>,
}

impl RoutineManager {
    /// Create a new routine manager over a repository.
    pub fn new(repo: Arc<dyn RoutineRepository>) -> Self {
        Self { repo }
    }

    /// Add an exercise to the catalog.
    pub async fn create_exercise(&self, exercise: &Exercise) -> Result<(), RoutineError> {
        validate_name("Exercise", &exercise.name)?;
        self.repo.insert_exercise(exercise).await?;
        tracing::info!(id = %exercise.id, name = %exercise.name, "Created exercise");
        Ok(())
    }

    pub async fn update_exercise(&self, exercise: &Exercise) -> Result<(), RoutineError> {
        validate_name("Exercise", &exercise.name)?;
        self.repo
            .update_exercise(exercise)
            .await
            .map_err(|e| not_found_as(e, exercise.id))
    }

    /// Delete an exercise. It is also dropped from every routine using it.
    pub async fn delete_exercise(&self, id: Uuid) -> Result<(), RoutineError> {
        self.repo
            .delete_exercise(id)
            .await
            .map_err(|e| not_found_as(e, id))?;
        tracing::info!(id = %id, "Deleted exercise");
        Ok(())
    }

    pub async fn list_exercises(&self) -> Result<Vec<Exercise>, RoutineError> {
        Ok(self.repo.list_exercises().await?)
    }

    /// Add a routine with its ordered exercises.
    pub async fn create_routine(&self, routine: &Routine) -> Result<(), RoutineError> {
        validate_routine(routine)?;
        self.repo.insert_routine(routine).await?;
        tracing::info!(
            id = %routine.id,
            name = %routine.name,
            exercises = routine.exercises.len(),
            "Created routine"
        );
        Ok(())
    }

    /// Replace a routine and its exercise list.
    pub async fn update_routine(&self, routine: &Routine) -> Result<(), RoutineError> {
        validate_routine(routine)?;
        self.repo
            .update_routine(routine)
            .await
            .map_err(|e| not_found_as(e, routine.id))
    }

    /// Delete a routine. Scheduled workouts keep their copied summary.
    pub async fn delete_routine(&self, id: Uuid) -> Result<(), RoutineError> {
        self.repo
            .delete_routine(id)
            .await
            .map_err(|e| not_found_as(e, id))?;
        tracing::info!(id = %id, "Deleted routine");
        Ok(())
    }

    pub async fn get_routine(&self, id: Uuid) -> Result<Option<Routine>, RoutineError> {
        Ok(self.repo.get_routine(id).await?)
    }

    /// Routines ordered by name, optionally filtered by category.
    pub async fn list_routines(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<Routine>, RoutineError> {
        Ok(self.repo.list_routines(category).await?)
    }
}

fn validate_name(kind: &str, name: &str) -> Result<(), RoutineError> {
    if name.trim().is_empty() {
        return Err(RoutineError::ValidationError(format!(
            "{kind} name cannot be empty"
        )));
    }
    Ok(())
}

fn validate_routine(routine: &Routine) -> Result<(), RoutineError> {
    validate_name("Routine", &routine.name)?;
    if routine.duration_minutes == 0 {
        return Err(RoutineError::ValidationError(
            "Routine duration must be positive".to_string(),
        ));
    }
    Ok(())
}

fn not_found_as(e: DatabaseError, id: Uuid) -> RoutineError {
    match e {
        DatabaseError::NotFound(_) => RoutineError::NotFound(id),
        other => RoutineError::DatabaseError(other),
    }
}

/// Routine management errors.
#[derive(Debug, thiserror::Error)]
pub enum RoutineError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::types::{Level, MuscleGroup, RoutineExercise};
    use crate::storage::sqlite_store::SqliteStore;

    fn manager() -> RoutineManager {
        RoutineManager::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_create_and_list_by_category() {
        let manager = manager();
        let burpee = Exercise::new("Burpees".to_string(), MuscleGroup::Cardio);
        manager.create_exercise(&burpee).await.unwrap();

        let mut hiit = Routine::new("HIIT".to_string(), Category::Other, Level::Advanced, 20);
        hiit.exercises.push(RoutineExercise {
            exercise: burpee,
            reps: Some("5x20".to_string()),
            notes: None,
        });
        let run = Routine::new("Easy Run".to_string(), Category::Running, Level::Beginner, 30);
        manager.create_routine(&hiit).await.unwrap();
        manager.create_routine(&run).await.unwrap();

        let all = manager.list_routines(None).await.unwrap();
        let names: Vec<_> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Easy Run", "HIIT"]);

        let running = manager.list_routines(Some(Category::Running)).await.unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, run.id);
    }

    #[tokio::test]
    async fn test_validation() {
        let manager = manager();

        let unnamed = Routine::new(" ".to_string(), Category::Other, Level::Beginner, 10);
        assert!(matches!(
            manager.create_routine(&unnamed).await,
            Err(RoutineError::ValidationError(_))
        ));

        let instant = Routine::new("Nothing".to_string(), Category::Other, Level::Beginner, 0);
        assert!(matches!(
            manager.create_routine(&instant).await,
            Err(RoutineError::ValidationError(_))
        ));

        let exercise = Exercise::new(String::new(), MuscleGroup::Core);
        assert!(matches!(
            manager.create_exercise(&exercise).await,
            Err(RoutineError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let manager = manager();
        let ghost = Routine::new("Ghost".to_string(), Category::Other, Level::Beginner, 10);

        assert!(matches!(
            manager.update_routine(&ghost).await,
            Err(RoutineError::NotFound(id)) if id == ghost.id
        ));
        assert!(matches!(
            manager.delete_routine(ghost.id).await,
            Err(RoutineError::NotFound(_))
        ));
        assert!(matches!(
            manager.delete_exercise(Uuid::new_v4()).await,
            Err(RoutineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleting_exercise_removes_it_from_routines() {
        let manager = manager();
        let squat = Exercise::new("Squats".to_string(), MuscleGroup::Legs);
        manager.create_exercise(&squat).await.unwrap();

        let mut legs = Routine::new("Legs".to_string(), Category::Strength, Level::Intermediate, 40);
        legs.exercises.push(RoutineExercise {
            exercise: squat.clone(),
            reps: None,
            notes: None,
        });
        manager.create_routine(&legs).await.unwrap();

        manager.delete_exercise(squat.id).await.unwrap();
        let loaded = manager.get_routine(legs.id).await.unwrap().unwrap();
        assert!(loaded.exercises.is_empty());
        assert!(manager.list_exercises().await.unwrap().is_empty());
    }
}
