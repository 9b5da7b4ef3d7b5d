//! Medal evaluation against aggregate stats.

use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::dates;
use crate::medals::types::{EarnedMedal, MedalDefinition, MedalProgress, RequirementType, UnlockedMedal};
use crate::progress::{load_stats, progress_percentage, AggregateStats};
use crate::storage::config::StatsSettings;
use crate::storage::database::DatabaseError;
use crate::storage::repository::{CompletionRepository, MedalCatalog, MedalRepository};

/// Unlocks medals whose requirement the user's stats satisfy.
#[derive(Clone)]
pub struct MedalEvaluator {
    catalog: Arc<dyn MedalCatalog>,
    medals: Arc<dyn MedalRepository>,
    completions: Arc<dyn CompletionRepository>,
    settings: StatsSettings,
}

impl MedalEvaluator {
    /// Create a new evaluator.
    pub fn new(
        catalog: Arc<dyn MedalCatalog>,
        medals: Arc<dyn MedalRepository>,
        completions: Arc<dyn CompletionRepository>,
        settings: StatsSettings,
    ) -> Self {
        Self {
            catalog,
            medals,
            completions,
            settings,
        }
    }

    /// Unlock newly satisfied medals and return only those unlocked by this call.
    ///
    /// Failing to load stats, the catalog or the unlocked set yields an empty
    /// list. A failure unlocking one medal is logged and the rest still run.
    pub async fn evaluate(&self, user_id: Uuid) -> Vec<EarnedMedal> {
        self.evaluate_at(user_id, dates::now_local()).await
    }

    /// `evaluate` relative to a fixed local time.
    pub async fn evaluate_at(&self, user_id: Uuid, now: NaiveDateTime) -> Vec<EarnedMedal> {
        match self.try_evaluate(user_id, now).await {
            Ok(earned) => earned,
            Err(e) => {
                tracing::error!(%user_id, "Medal evaluation aborted: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_evaluate(
        &self,
        user_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Vec<EarnedMedal>, MedalError> {
        let stats = load_stats(self.completions.as_ref(), user_id, &self.settings, now).await?;
        let catalog = self.catalog.list_medals().await?;
        let unlocked: HashSet<String> = self
            .medals
            .list_unlocked(user_id)
            .await?
            .into_iter()
            .map(|u| u.medal_id)
            .collect();

        let mut newly_earned = Vec::new();

        for medal in catalog {
            if unlocked.contains(&medal.id) {
                continue;
            }

            let current = current_value(medal.requirement_type, &stats);
            let meets_criteria = current.is_some_and(|value| value >= medal.requirement_value);
            tracing::debug!(
                medal = %medal.id,
                current = ?current,
                threshold = medal.requirement_value,
                meets_criteria,
                "Checked medal"
            );

            if !meets_criteria {
                continue;
            }

            match self.unlock(user_id, &medal).await {
                Ok(Some(record)) => {
                    tracing::info!(%user_id, medal = %medal.id, "Medal unlocked");
                    newly_earned.push(EarnedMedal {
                        medal,
                        unlocked_at: record.unlocked_at,
                    });
                }
                Ok(None) => {
                    tracing::debug!(%user_id, medal = %medal.id, "Medal already unlocked elsewhere");
                }
                Err(e) => {
                    tracing::warn!(%user_id, "{}", e);
                }
            }
        }

        Ok(newly_earned)
    }

    /// Insert the unlock record. `None` when the uniqueness guard reports it exists.
    async fn unlock(
        &self,
        user_id: Uuid,
        medal: &MedalDefinition,
    ) -> Result<Option<UnlockedMedal>, MedalError> {
        let record = UnlockedMedal::new(user_id, &medal.id);

        match self.medals.insert_unlocked(&record).await {
            Ok(()) => Ok(Some(record)),
            Err(DatabaseError::Duplicate(_)) => Ok(None),
            Err(source) => Err(MedalError::UnlockFailed {
                medal_id: medal.id.clone(),
                source,
            }),
        }
    }

    /// Progress towards every medal in the catalog, in catalog order.
    pub async fn progress_towards(&self, user_id: Uuid) -> Result<Vec<MedalProgress>, MedalError> {
        self.progress_towards_at(user_id, dates::now_local()).await
    }

    /// `progress_towards` relative to a fixed local time.
    pub async fn progress_towards_at(
        &self,
        user_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Vec<MedalProgress>, MedalError> {
        let stats = load_stats(self.completions.as_ref(), user_id, &self.settings, now).await?;
        let catalog = self.catalog.list_medals().await?;
        let unlocked: HashSet<String> = self
            .medals
            .list_unlocked(user_id)
            .await?
            .into_iter()
            .map(|u| u.medal_id)
            .collect();

        Ok(catalog
            .into_iter()
            .map(|medal| {
                if unlocked.contains(&medal.id) {
                    return MedalProgress {
                        medal,
                        is_unlocked: true,
                        current_value: None,
                        percentage: 100,
                    };
                }

                let current = current_value(medal.requirement_type, &stats).unwrap_or(0);
                MedalProgress {
                    percentage: progress_percentage(current, medal.requirement_value),
                    medal,
                    is_unlocked: false,
                    current_value: Some(current),
                }
            })
            .collect())
    }

    /// Earned medals with their catalog entries, newest first.
    pub async fn unlocked_medals(&self, user_id: Uuid) -> Result<Vec<EarnedMedal>, MedalError> {
        let catalog: HashMap<String, MedalDefinition> = self
            .catalog
            .list_medals()
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        let mut earned = Vec::new();
        for unlocked in self.medals.list_unlocked(user_id).await? {
            match catalog.get(&unlocked.medal_id) {
                Some(medal) => earned.push(EarnedMedal {
                    medal: medal.clone(),
                    unlocked_at: unlocked.unlocked_at,
                }),
                None => {
                    tracing::warn!(medal = %unlocked.medal_id, "Unlocked medal missing from catalog");
                }
            }
        }

        Ok(earned)
    }
}

/// Stat a requirement is measured against. `None` when the stat is not tracked.
fn current_value(requirement: RequirementType, stats: &AggregateStats) -> Option<u64> {
    match requirement {
        RequirementType::CompletedCount => Some(stats.total_completed),
        RequirementType::ConsecutiveDays => Some(u64::from(stats.streak)),
        RequirementType::CaloriesBurned => Some(stats.total_calories),
        RequirementType::EarlyMorningCount => {
            tracing::debug!("Early morning workouts are not tracked");
            stats.early_morning_count
        }
    }
}

/// Medal errors.
#[derive(Debug, thiserror::Error)]
pub enum MedalError {
    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Failed to unlock medal {medal_id}: {source}")]
    UnlockFailed {
        medal_id: String,
        source: DatabaseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medals::types::{default_medals, MedalCategory};
    use crate::schedule::{CompletionRecord, Effort};
    use crate::storage::sqlite_store::SqliteStore;
    use async_trait::async_trait;
    use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 15)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    fn evaluator_for(store: &Arc<SqliteStore>) -> MedalEvaluator {
        MedalEvaluator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            StatsSettings::default(),
        )
    }

    async fn complete_days_ago(store: &SqliteStore, user: Uuid, days: i64, calories: u32) {
        let local = now() - Duration::days(days);
        let at = Local
            .from_local_datetime(&local)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        let mut record = CompletionRecord::ad_hoc(
            user,
            Uuid::new_v4(),
            Effort {
                duration_minutes: 30,
                calories_burned: calories,
            },
            at,
        );
        record.completed_date = local.date();
        store.insert_completion(&record).await.unwrap();
    }

    fn seeded() -> Arc<SqliteStore> {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_default_medals().unwrap();
        Arc::new(store)
    }

    fn ids(earned: &[EarnedMedal]) -> Vec<&str> {
        earned.iter().map(|e| e.medal.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_no_history_unlocks_nothing() {
        let store = seeded();
        let evaluator = evaluator_for(&store);
        assert!(evaluator.evaluate_at(Uuid::new_v4(), now()).await.is_empty());
    }

    #[tokio::test]
    async fn test_first_workout_unlocks_once() {
        let store = seeded();
        let evaluator = evaluator_for(&store);
        let user = Uuid::new_v4();
        complete_days_ago(&store, user, 0, 100).await;

        let first = evaluator.evaluate_at(user, now()).await;
        assert_eq!(ids(&first), vec!["first_workout"]);

        let second = evaluator.evaluate_at(user, now()).await;
        assert!(second.is_empty());
        assert_eq!(store.list_unlocked(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_streak_and_calorie_medals() {
        let store = seeded();
        let evaluator = evaluator_for(&store);
        let user = Uuid::new_v4();
        for days in 0..3 {
            complete_days_ago(&store, user, days, 400).await;
        }

        let earned = evaluator.evaluate_at(user, now()).await;
        let earned = ids(&earned);
        assert!(earned.contains(&"first_workout"));
        assert!(earned.contains(&"streak_3"));
        assert!(earned.contains(&"calories_1000"));
        assert!(!earned.contains(&"streak_7"));
        assert!(!earned.contains(&"early_bird"));
    }

    #[tokio::test]
    async fn test_concurrent_unlock_is_not_reported() {
        let store = seeded();
        let evaluator = evaluator_for(&store);
        let user = Uuid::new_v4();
        complete_days_ago(&store, user, 0, 100).await;

        // Another device already unlocked it between our read and write.
        struct RacingMedals(Arc<SqliteStore>);

        #[async_trait]
        impl MedalRepository for RacingMedals {
            async fn list_unlocked(&self, _user_id: Uuid) -> Result<Vec<UnlockedMedal>, DatabaseError> {
                Ok(Vec::new())
            }

            async fn insert_unlocked(&self, unlocked: &UnlockedMedal) -> Result<(), DatabaseError> {
                self.0.insert_unlocked(unlocked).await
            }
        }

        store
            .insert_unlocked(&UnlockedMedal::new(user, "first_workout"))
            .await
            .unwrap();
        let racing = MedalEvaluator::new(
            store.clone(),
            Arc::new(RacingMedals(store.clone())),
            store.clone(),
            StatsSettings::default(),
        );

        assert!(racing.evaluate_at(user, now()).await.is_empty());
        assert_eq!(store.list_unlocked(user).await.unwrap().len(), 1);
        assert!(evaluator.evaluate_at(user, now()).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_unlock_does_not_abort_others() {
        struct FlakyMedals {
            inner: Arc<SqliteStore>,
            failing: &'static str,
        }

        #[async_trait]
        impl MedalRepository for FlakyMedals {
            async fn list_unlocked(&self, user_id: Uuid) -> Result<Vec<UnlockedMedal>, DatabaseError> {
                self.inner.list_unlocked(user_id).await
            }

            async fn insert_unlocked(&self, unlocked: &UnlockedMedal) -> Result<(), DatabaseError> {
                if unlocked.medal_id == self.failing {
                    return Err(DatabaseError::QueryFailed("connection reset".to_string()));
                }
                self.inner.insert_unlocked(unlocked).await
            }
        }

        let store = seeded();
        let user = Uuid::new_v4();
        for days in 0..3 {
            complete_days_ago(&store, user, days, 50).await;
        }

        let evaluator = MedalEvaluator::new(
            store.clone(),
            Arc::new(FlakyMedals {
                inner: store.clone(),
                failing: "first_workout",
            }),
            store.clone(),
            StatsSettings::default(),
        );

        let earned = evaluator.evaluate_at(user, now()).await;
        assert_eq!(ids(&earned), vec!["streak_3"]);
    }

    #[tokio::test]
    async fn test_catalog_failure_returns_empty() {
        struct BrokenCatalog;

        #[async_trait]
        impl MedalCatalog for BrokenCatalog {
            async fn list_medals(&self) -> Result<Vec<MedalDefinition>, DatabaseError> {
                Err(DatabaseError::ConnectionFailed("offline".to_string()))
            }
        }

        let store = seeded();
        let user = Uuid::new_v4();
        complete_days_ago(&store, user, 0, 100).await;

        let evaluator = MedalEvaluator::new(
            Arc::new(BrokenCatalog),
            store.clone(),
            store.clone(),
            StatsSettings::default(),
        );

        assert!(evaluator.evaluate_at(user, now()).await.is_empty());
        assert!(store.list_unlocked(user).await.unwrap().is_empty());
        assert!(matches!(
            evaluator.progress_towards_at(user, now()).await,
            Err(MedalError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_progress_towards() {
        let store = seeded();
        let evaluator = evaluator_for(&store);
        let user = Uuid::new_v4();
        for days in 0..2 {
            complete_days_ago(&store, user, days, 250).await;
        }
        evaluator.evaluate_at(user, now()).await;

        let progress = evaluator.progress_towards_at(user, now()).await.unwrap();
        assert_eq!(progress.len(), default_medals().len());

        let find = |id: &str| progress.iter().find(|p| p.medal.id == id).unwrap();

        let first = find("first_workout");
        assert!(first.is_unlocked);
        assert_eq!(first.percentage, 100);
        assert_eq!(first.current_value, None);

        let streak = find("streak_3");
        assert!(!streak.is_unlocked);
        assert_eq!(streak.current_value, Some(2));
        assert_eq!(streak.percentage, 67);

        let calories = find("calories_1000");
        assert_eq!(calories.percentage, 50);

        let early = find("early_bird");
        assert_eq!(early.current_value, Some(0));
        assert_eq!(early.percentage, 0);
        assert_eq!(early.medal.category, MedalCategory::Special);
    }

    #[tokio::test]
    async fn test_unlocked_medals_joins_catalog() {
        let store = seeded();
        let evaluator = evaluator_for(&store);
        let user = Uuid::new_v4();
        complete_days_ago(&store, user, 0, 100).await;
        evaluator.evaluate_at(user, now()).await;

        let earned = evaluator.unlocked_medals(user).await.unwrap();
        assert_eq!(ids(&earned), vec!["first_workout"]);
        assert_eq!(earned[0].medal.name, "First Step");
    }
}
