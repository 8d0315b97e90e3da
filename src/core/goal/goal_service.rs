// Goal engine - savings goals with a one-shot completion bonus.
//
// `completed` is a write-once monotonic bit: the transition credits
// floor(0.1 x target) to the wallet inside the same transaction that crossed
// the target, and every later progress call is rejected.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::error::{FieldError, GameError};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(
        user_id: Uuid,
        title: String,
        description: Option<String>,
        target_amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            description,
            target_amount,
            current_amount: Decimal::ZERO,
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalFilter {
    All,
    Active,
    Completed,
}

/// What one progress call did.
#[derive(Debug, Clone)]
pub struct GoalProgressOutcome {
    pub goal: Goal,
    pub progress_pct: f64,
    /// Bonus credited by this very call; set only on the completing one.
    pub bonus_awarded: Option<Decimal>,
}

// ============================================================================
// COMPLETION RULES
// ============================================================================

/// Bonus for reaching a goal: floor of a tenth of the target.
pub fn completion_bonus(target_amount: Decimal) -> Decimal {
    (target_amount * Decimal::new(1, 1)).floor()
}

/// Percentage toward the target, clamped to 100.
pub fn progress_pct(current: Decimal, target: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;

    if target <= Decimal::ZERO {
        return 100.0;
    }
    let ratio = (current / target)
        .to_f64()
        .unwrap_or(if current >= target { 1.0 } else { 0.0 });
    (ratio * 100.0).min(100.0)
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

#[async_trait]
pub trait GoalStore: Send + Sync {
    async fn insert(&self, goal: Goal) -> Result<Goal, GameError>;

    /// Goals for the user, newest first.
    async fn list(&self, user_id: Uuid, filter: GoalFilter) -> Result<Vec<Goal>, GameError>;

    /// One transaction: lock the goal row, add the amount, and on crossing
    /// the target flip `completed`, stamp `completed_at` and credit the
    /// bonus. An already-completed goal fails with `AlreadyCompleted`.
    async fn add_progress(
        &self,
        id: Uuid,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<GoalProgressOutcome, GameError>;

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), GameError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct GoalService<S: GoalStore> {
    store: S,
}

impl<S: GoalStore> GoalService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        target_amount: Decimal,
    ) -> Result<Goal, GameError> {
        let title = title.trim();
        if title.is_empty() || title.chars().count() > 100 {
            return Err(GameError::ValidationFailed(vec![FieldError::new(
                "title",
                "title must be 1-100 characters",
            )]));
        }
        if target_amount <= Decimal::ZERO {
            return Err(GameError::InvalidAmount(format!(
                "target amount must be positive, got {}",
                target_amount
            )));
        }
        self.store
            .insert(Goal::new(
                user_id,
                title.to_string(),
                description.map(str::to_string),
                target_amount,
            ))
            .await
    }

    pub async fn list(&self, user_id: Uuid, filter: GoalFilter) -> Result<Vec<Goal>, GameError> {
        self.store.list(user_id, filter).await
    }

    pub async fn add_progress(
        &self,
        id: Uuid,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<GoalProgressOutcome, GameError> {
        if amount <= Decimal::ZERO {
            return Err(GameError::InvalidAmount(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        let outcome = self.store.add_progress(id, user_id, amount).await?;
        if let Some(bonus) = outcome.bonus_awarded {
            tracing::info!(
                user_id = %user_id,
                goal = %outcome.goal.title,
                bonus = %bonus,
                "goal completed, bonus credited"
            );
        }
        Ok(outcome)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), GameError> {
        self.store.delete(id, user_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    /// In-memory goal store; bonus credits land in `credits` so tests can
    /// assert the exactly-once behavior.
    pub(crate) struct InMemoryGoalStore {
        pub goals: Arc<Mutex<Vec<Goal>>>,
        pub credits: Arc<Mutex<Vec<Decimal>>>,
    }

    impl InMemoryGoalStore {
        pub fn new() -> Self {
            Self {
                goals: Arc::new(Mutex::new(Vec::new())),
                credits: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl GoalStore for InMemoryGoalStore {
        async fn insert(&self, goal: Goal) -> Result<Goal, GameError> {
            self.goals.lock().unwrap().push(goal.clone());
            Ok(goal)
        }

        async fn list(&self, user_id: Uuid, filter: GoalFilter) -> Result<Vec<Goal>, GameError> {
            let goals = self.goals.lock().unwrap();
            Ok(goals
                .iter()
                .rev()
                .filter(|g| g.user_id == user_id)
                .filter(|g| match filter {
                    GoalFilter::All => true,
                    GoalFilter::Active => !g.completed,
                    GoalFilter::Completed => g.completed,
                })
                .cloned()
                .collect())
        }

        async fn add_progress(
            &self,
            id: Uuid,
            user_id: Uuid,
            amount: Decimal,
        ) -> Result<GoalProgressOutcome, GameError> {
            let mut goals = self.goals.lock().unwrap();
            let goal = goals
                .iter_mut()
                .find(|g| g.id == id && g.user_id == user_id)
                .ok_or(GameError::NotFound("goal"))?;
            if goal.completed {
                return Err(GameError::AlreadyCompleted);
            }

            goal.current_amount += amount;
            goal.updated_at = Utc::now();
            let mut bonus = None;
            if goal.current_amount >= goal.target_amount {
                goal.completed = true;
                goal.completed_at = Some(Utc::now());
                let awarded = completion_bonus(goal.target_amount);
                self.credits.lock().unwrap().push(awarded);
                bonus = Some(awarded);
            }
            Ok(GoalProgressOutcome {
                progress_pct: progress_pct(goal.current_amount, goal.target_amount),
                goal: goal.clone(),
                bonus_awarded: bonus,
            })
        }

        async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), GameError> {
            let mut goals = self.goals.lock().unwrap();
            let before = goals.len();
            goals.retain(|g| !(g.id == id && g.user_id == user_id));
            if goals.len() == before {
                return Err(GameError::NotFound("goal"));
            }
            Ok(())
        }
    }

    fn service() -> GoalService<InMemoryGoalStore> {
        GoalService::new(InMemoryGoalStore::new())
    }

    #[test]
    fn bonus_is_floor_of_a_tenth() {
        assert_eq!(completion_bonus(dec!(1000)), dec!(100));
        assert_eq!(completion_bonus(dec!(999)), dec!(99));
        assert_eq!(completion_bonus(dec!(5)), dec!(0));
        assert_eq!(completion_bonus(dec!(1234.56)), dec!(123));
    }

    #[tokio::test]
    async fn exact_target_completes_with_bonus() {
        let service = service();
        let user = Uuid::new_v4();
        let goal = service
            .create(user, "bike", None, dec!(1000))
            .await
            .unwrap();

        let outcome = service
            .add_progress(goal.id, user, dec!(1000))
            .await
            .unwrap();
        assert!(outcome.goal.completed);
        assert!(outcome.goal.completed_at.is_some());
        assert_eq!(outcome.progress_pct, 100.0);
        assert_eq!(outcome.bonus_awarded, Some(dec!(100)));

        let err = service
            .add_progress(goal.id, user, dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::AlreadyCompleted));
        assert_eq!(service.store.credits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn partial_progress_reports_percentage() {
        let service = service();
        let user = Uuid::new_v4();
        let goal = service.create(user, "robot", None, dec!(200)).await.unwrap();

        let outcome = service.add_progress(goal.id, user, dec!(50)).await.unwrap();
        assert_eq!(outcome.progress_pct, 25.0);
        assert!(!outcome.goal.completed);
        assert!(outcome.bonus_awarded.is_none());
    }

    #[tokio::test]
    async fn progress_on_someone_elses_goal_is_not_found() {
        let service = service();
        let owner = Uuid::new_v4();
        let goal = service.create(owner, "kite", None, dec!(50)).await.unwrap();

        let err = service
            .add_progress(goal.id, Uuid::new_v4(), dec!(10))
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::NotFound("goal")));
    }

    #[tokio::test]
    async fn listing_filters_by_completion() {
        let service = service();
        let user = Uuid::new_v4();
        let done = service.create(user, "done", None, dec!(10)).await.unwrap();
        service.create(user, "open", None, dec!(10)).await.unwrap();
        service.add_progress(done.id, user, dec!(10)).await.unwrap();

        let active = service.list(user, GoalFilter::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "open");

        let completed = service.list(user, GoalFilter::Completed).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].title, "done");

        assert_eq!(service.list(user, GoalFilter::All).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_validates_inputs() {
        let service = service();
        let user = Uuid::new_v4();

        let err = service.create(user, "  ", None, dec!(10)).await.unwrap_err();
        assert!(matches!(err, GameError::ValidationFailed(_)));

        let err = service.create(user, "bike", None, dec!(0)).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn delete_scopes_to_owner() {
        let service = service();
        let user = Uuid::new_v4();
        let goal = service.create(user, "kite", None, dec!(50)).await.unwrap();

        let err = service.delete(goal.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, GameError::NotFound("goal")));
        service.delete(goal.id, user).await.unwrap();
        assert!(service.list(user, GoalFilter::All).await.unwrap().is_empty());
    }
}
