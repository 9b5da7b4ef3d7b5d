//! Medal catalog and unlock types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Medal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedalCategory {
    /// Streak-based achievements
    Consistency,
    /// Workout count milestones
    Volume,
    /// Calorie milestones
    Intensity,
    /// Unique achievements
    Special,
}

impl MedalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MedalCategory::Consistency => "consistency",
            MedalCategory::Volume => "volume",
            MedalCategory::Intensity => "intensity",
            MedalCategory::Special => "special",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "consistency" => Some(MedalCategory::Consistency),
            "volume" => Some(MedalCategory::Volume),
            "intensity" => Some(MedalCategory::Intensity),
            "special" => Some(MedalCategory::Special),
            _ => None,
        }
    }
}

/// Stat a medal requirement is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    /// All-time completed workouts
    CompletedCount,
    /// Current streak in days
    ConsecutiveDays,
    /// Calories burned
    CaloriesBurned,
    /// Workouts started early in the morning (not tracked)
    EarlyMorningCount,
}

impl RequirementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::CompletedCount => "completed_count",
            RequirementType::ConsecutiveDays => "consecutive_days",
            RequirementType::CaloriesBurned => "calories_burned",
            RequirementType::EarlyMorningCount => "early_morning_count",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed_count" => Some(RequirementType::CompletedCount),
            "consecutive_days" => Some(RequirementType::ConsecutiveDays),
            "calories_burned" => Some(RequirementType::CaloriesBurned),
            "early_morning_count" => Some(RequirementType::EarlyMorningCount),
            _ => None,
        }
    }

    /// Unit label for progress display.
    pub fn unit(&self) -> &'static str {
        match self {
            RequirementType::CompletedCount => "workouts",
            RequirementType::ConsecutiveDays => "days",
            RequirementType::CaloriesBurned => "kcal",
            RequirementType::EarlyMorningCount => "early workouts",
        }
    }
}

/// Catalog entry describing an unlockable achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedalDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: MedalCategory,
    pub requirement_type: RequirementType,
    pub requirement_value: u64,
}

/// Join record between a user and a medal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedMedal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub medal_id: String,
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockedMedal {
    /// New unlock record stamped with the current time.
    pub fn new(user_id: Uuid, medal_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            medal_id: medal_id.to_string(),
            unlocked_at: Utc::now(),
        }
    }
}

/// Earned medal with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedMedal {
    pub medal: MedalDefinition,
    pub unlocked_at: DateTime<Utc>,
}

/// Progress towards a medal for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedalProgress {
    pub medal: MedalDefinition,
    pub is_unlocked: bool,
    /// Not computed for unlocked medals
    pub current_value: Option<u64>,
    /// 0-100
    pub percentage: u8,
}

fn medal(
    id: &str,
    name: &str,
    description: &str,
    icon: &str,
    category: MedalCategory,
    requirement_type: RequirementType,
    requirement_value: u64,
) -> MedalDefinition {
    MedalDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        category,
        requirement_type,
        requirement_value,
    }
}

/// Default medal definitions.
pub fn default_medals() -> Vec<MedalDefinition> {
    vec![
        medal(
            "first_workout",
            "First Step",
            "Complete your first workout",
            "🏁",
            MedalCategory::Special,
            RequirementType::CompletedCount,
            1,
        ),
        medal(
            "workouts_10",
            "Getting Serious",
            "Complete 10 workouts",
            "🎯",
            MedalCategory::Volume,
            RequirementType::CompletedCount,
            10,
        ),
        medal(
            "workouts_50",
            "Half Century",
            "Complete 50 workouts",
            "👑",
            MedalCategory::Volume,
            RequirementType::CompletedCount,
            50,
        ),
        medal(
            "streak_3",
            "On a Roll",
            "Train 3 days in a row",
            "🔥",
            MedalCategory::Consistency,
            RequirementType::ConsecutiveDays,
            3,
        ),
        medal(
            "streak_7",
            "Week Warrior",
            "Train 7 days in a row",
            "📅",
            MedalCategory::Consistency,
            RequirementType::ConsecutiveDays,
            7,
        ),
        medal(
            "streak_30",
            "Unstoppable",
            "Train 30 days in a row",
            "🌟",
            MedalCategory::Consistency,
            RequirementType::ConsecutiveDays,
            30,
        ),
        medal(
            "calories_1000",
            "Furnace",
            "Burn 1000 kcal",
            "⚡",
            MedalCategory::Intensity,
            RequirementType::CaloriesBurned,
            1000,
        ),
        medal(
            "calories_5000",
            "Inferno",
            "Burn 5000 kcal",
            "💪",
            MedalCategory::Intensity,
            RequirementType::CaloriesBurned,
            5000,
        ),
        medal(
            "early_bird",
            "Early Bird",
            "Finish 5 workouts before breakfast",
            "🌅",
            MedalCategory::Special,
            RequirementType::EarlyMorningCount,
            5,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_catalog_ids_unique() {
        let medals = default_medals();
        let ids: HashSet<_> = medals.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), medals.len());
        assert!(medals.iter().all(|m| m.requirement_value > 0));
    }

    #[test]
    fn test_requirement_type_strings() {
        for kind in [
            RequirementType::CompletedCount,
            RequirementType::ConsecutiveDays,
            RequirementType::CaloriesBurned,
            RequirementType::EarlyMorningCount,
        ] {
            assert_eq!(RequirementType::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(RequirementType::from_str("hora_entrenamiento"), None);
    }
}
