//! User administration.

use std::sync::Arc;
use uuid::Uuid;

use super::types::{Role, RoleCounts, UserProfile, UserSummary};
use crate::schedule::WorkoutStatus;
use crate::storage::database::DatabaseError;
use crate::storage::repository::{ScheduleFilter, ScheduleRepository, UserFilter, UserRepository};

/// Manager for registered users and their roles.
pub struct UserManager {
    users: Arc<dyn UserRepository>,
    schedule: Arc<dyn ScheduleRepository>,
}

impl UserManager {
    pub fn new(users: Arc<dyn UserRepository>, schedule: Arc<dyn ScheduleRepository>) -> Self {
        Self { users, schedule }
    }

    /// Register a user. The email is trimmed and lowercased.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        role: Role,
    ) -> Result<UserProfile, UserError> {
        let user = UserProfile::new(name.trim().to_string(), email.trim().to_lowercase(), role);
        self.add(&user).await?;
        Ok(user)
    }

    /// Store a prepared profile, keeping its id.
    pub async fn add(&self, user: &UserProfile) -> Result<(), UserError> {
        validate(user)?;

        match self.users.insert_user(user).await {
            Ok(()) => {}
            Err(DatabaseError::Duplicate(_)) => {
                return Err(UserError::EmailTaken(user.email.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(id = %user.id, role = %user.role, "Registered user");
        Ok(())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserProfile, UserError> {
        self.users
            .get_user(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// Users ordered by name, narrowed by search text and role.
    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserProfile>, UserError> {
        Ok(self.users.list_users(filter).await?)
    }

    pub async fn role_counts(&self) -> Result<RoleCounts, UserError> {
        let users = self.users.list_users(&UserFilter::default()).await?;
        let admins = users.iter().filter(|u| u.role == Role::Admin).count();
        Ok(RoleCounts {
            total: users.len(),
            users: users.len() - admins,
            admins,
        })
    }

    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<(), UserError> {
        self.users
            .update_role(id, role)
            .await
            .map_err(|e| not_found_as(e, id))?;
        tracing::info!(id = %id, role = %role, "Changed user role");
        Ok(())
    }

    /// Delete a user and everything they own.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), UserError> {
        self.users
            .delete_user(id)
            .await
            .map_err(|e| not_found_as(e, id))?;
        tracing::info!(id = %id, "Deleted user");
        Ok(())
    }

    /// Schedule overview for one user.
    pub async fn user_summary(&self, id: Uuid) -> Result<UserSummary, UserError> {
        let user = self.get_user(id).await?;
        let entries = self
            .schedule
            .list_scheduled(id, &ScheduleFilter::default())
            .await?;

        let completed: Vec<_> = entries
            .iter()
            .filter(|e| e.status == WorkoutStatus::Completed)
            .collect();

        Ok(UserSummary {
            scheduled: entries.len(),
            completed: completed.len(),
            pending: entries.len() - completed.len(),
            total_minutes: completed
                .iter()
                .map(|e| u64::from(e.routine.duration_minutes))
                .sum(),
            total_calories: completed.iter().map(|e| u64::from(e.routine.calories)).sum(),
            last_activity: entries.iter().map(|e| e.scheduled_date).max(),
            user,
        })
    }
}

fn validate(user: &UserProfile) -> Result<(), UserError> {
    if user.name.trim().is_empty() {
        return Err(UserError::ValidationError(
            "User name cannot be empty".to_string(),
        ));
    }
    let valid_email = user
        .email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(UserError::ValidationError(format!(
            "Invalid email '{}'",
            user.email
        )));
    }
    Ok(())
}

fn not_found_as(e: DatabaseError, id: Uuid) -> UserError {
    match e {
        DatabaseError::NotFound(_) => UserError::NotFound(id),
        other => UserError::DatabaseError(other),
    }
}

/// User management errors.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("Email already registered: {0}")]
    EmailTaken(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{RoutineSummary, ScheduledWorkout};
    use crate::storage::sqlite_store::SqliteStore;
    use chrono::{NaiveDate, Utc};

    fn setup() -> (Arc<SqliteStore>, UserManager) {
        let sqlite = Arc::new(SqliteStore::open_in_memory().unwrap());
        let manager = UserManager::new(sqlite.clone(), sqlite.clone());
        (sqlite, manager)
    }

    fn routine(minutes: u32, calories: u32) -> RoutineSummary {
        RoutineSummary {
            routine_id: Uuid::new_v4(),
            name: "Circuit".to_string(),
            category: "strength".to_string(),
            duration_minutes: minutes,
            calories,
            exercises: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_and_rejects_duplicates() {
        let (_sqlite, manager) = setup();

        let user = manager
            .register(" Ana ", " Ana@Example.COM ", Role::User)
            .await
            .unwrap();
        assert_eq!(user.name, "Ana");
        assert_eq!(user.email, "ana@example.com");

        assert!(matches!(
            manager.register("Other Ana", "ana@example.com", Role::User).await,
            Err(UserError::EmailTaken(_))
        ));
        assert!(matches!(
            manager.register("", "x@example.com", Role::User).await,
            Err(UserError::ValidationError(_))
        ));
        assert!(matches!(
            manager.register("No Mail", "not-an-email", Role::User).await,
            Err(UserError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_roles_and_counts() {
        let (_sqlite, manager) = setup();
        let ana = manager.register("Ana", "ana@example.com", Role::User).await.unwrap();
        manager.register("Bo", "bo@example.com", Role::User).await.unwrap();
        manager.register("Cy", "cy@example.com", Role::Admin).await.unwrap();

        let counts = manager.role_counts().await.unwrap();
        assert_eq!((counts.total, counts.users, counts.admins), (3, 2, 1));

        manager.update_role(ana.id, Role::Admin).await.unwrap();
        let admins = manager
            .list_users(&UserFilter {
                search: None,
                role: Some(Role::Admin),
            })
            .await
            .unwrap();
        let names: Vec<_> = admins.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Cy"]);

        let ghost = Uuid::new_v4();
        assert!(matches!(
            manager.update_role(ghost, Role::User).await,
            Err(UserError::NotFound(id)) if id == ghost
        ));
    }

    #[tokio::test]
    async fn test_user_summary() {
        let (sqlite, manager) = setup();
        let user = manager.register("Ana", "ana@example.com", Role::User).await.unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();

        let mut done = ScheduledWorkout::new(user.id, routine(45, 300), day(3));
        done.mark_completed(Utc::now());
        sqlite.insert_scheduled(&done).await.unwrap();
        sqlite
            .insert_scheduled(&ScheduledWorkout::new(user.id, routine(30, 200), day(10)))
            .await
            .unwrap();

        let summary = manager.user_summary(user.id).await.unwrap();
        assert_eq!(summary.scheduled, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.total_minutes, 45);
        assert_eq!(summary.total_calories, 300);
        assert_eq!(summary.last_activity, Some(day(10)));

        let idle = manager.register("Bo", "bo@example.com", Role::User).await.unwrap();
        let summary = manager.user_summary(idle.id).await.unwrap();
        assert_eq!(summary.scheduled, 0);
        assert_eq!(summary.last_activity, None);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (_sqlite, manager) = setup();
        let user = manager.register("Ana", "ana@example.com", Role::User).await.unwrap();

        manager.delete_user(user.id).await.unwrap();
        assert!(matches!(
            manager.get_user(user.id).await,
            Err(UserError::NotFound(_))
        ));
        assert!(matches!(
            manager.delete_user(user.id).await,
            Err(UserError::NotFound(_))
        ));
        assert!(matches!(
            manager.user_summary(user.id).await,
            Err(UserError::NotFound(_))
        ));
    }
}
