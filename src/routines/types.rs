//! Routine catalog type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::RoutineSummary;

/// Routine category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Strength,
    Running,
    Cycling,
    Swimming,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Strength => "strength",
            Category::Running => "running",
            Category::Cycling => "cycling",
            Category::Swimming => "swimming",
            Category::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "strength" => Some(Category::Strength),
            "running" => Some(Category::Running),
            "cycling" => Some(Category::Cycling),
            "swimming" => Some(Category::Swimming),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Level::Beginner),
            "intermediate" => Some(Level::Intermediate),
            "advanced" => Some(Level::Advanced),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Primary muscle group of an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Legs,
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Core,
    Cardio,
}

impl MuscleGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Legs => "legs",
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Core => "core",
            MuscleGroup::Cardio => "cardio",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "legs" => Some(MuscleGroup::Legs),
            "chest" => Some(MuscleGroup::Chest),
            "back" => Some(MuscleGroup::Back),
            "shoulders" => Some(MuscleGroup::Shoulders),
            "biceps" => Some(MuscleGroup::Biceps),
            "triceps" => Some(MuscleGroup::Triceps),
            "core" => Some(MuscleGroup::Core),
            "cardio" => Some(MuscleGroup::Cardio),
            _ => None,
        }
    }
}

/// A single exercise in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub muscle_group: MuscleGroup,
}

impl Exercise {
    /// Create a new exercise.
    pub fn new(name: String, muscle_group: MuscleGroup) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            video_url: None,
            muscle_group,
        }
    }
}

/// Exercise slot within a routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineExercise {
    pub exercise: Exercise,
    /// Free-form prescription, e.g. "3x12"
    pub reps: Option<String>,
    pub notes: Option<String>,
}

/// A named, categorized workout definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub level: Level,
    pub duration_minutes: u32,
    /// Estimated calories for one session
    pub calories: u32,
    /// Ordered exercise list
    pub exercises: Vec<RoutineExercise>,
    pub created_at: DateTime<Utc>,
}

impl Routine {
    /// Create a new routine with no exercises.
    pub fn new(name: String, category: Category, level: Level, duration_minutes: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            category,
            level,
            duration_minutes,
            calories: 0,
            exercises: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Denormalized summary used when scheduling.
    pub fn summary(&self) -> RoutineSummary {
        RoutineSummary {
            routine_id: self.id,
            name: self.name.clone(),
            category: self.category.as_str().to_string(),
            duration_minutes: self.duration_minutes,
            calories: self.calories,
            exercises: self
                .exercises
                .iter()
                .map(|slot| slot.exercise.name.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_keeps_exercise_order() {
        let mut routine = Routine::new(
            "Leg Day".to_string(),
            Category::Strength,
            Level::Intermediate,
            40,
        );
        routine.calories = 320;
        for name in ["Squats", "Lunges", "Deadlift"] {
            routine.exercises.push(RoutineExercise {
                exercise: Exercise::new(name.to_string(), MuscleGroup::Legs),
                reps: Some("3x10".to_string()),
                notes: None,
            });
        }

        let summary = routine.summary();
        assert_eq!(summary.routine_id, routine.id);
        assert_eq!(summary.category, "strength");
        assert_eq!(summary.calories, 320);
        assert_eq!(summary.exercises, vec!["Squats", "Lunges", "Deadlift"]);
    }

    #[test]
    fn test_enum_strings() {
        assert_eq!(Category::from_str("cycling"), Some(Category::Cycling));
        assert_eq!(Level::from_str(Level::Advanced.as_str()), Some(Level::Advanced));
        assert_eq!(MuscleGroup::from_str("core"), Some(MuscleGroup::Core));
        assert_eq!(MuscleGroup::from_str("piernas"), None);
    }
}
