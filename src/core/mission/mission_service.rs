// Mission engine - daily missions, activity logging and the reward state
// machine.
//
// A UserMission is a two-state machine (incomplete -> completed). The
// completing update flips the bit, stamps completedAt and credits the reward
// inside the same storage transaction as the activity row; repeat logs after
// completion leave the record untouched and never credit again.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::error::GameError;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Counter keys used in the tag-keyed `requirements` and `progress` maps.
pub const EXPENSE_COUNT: &str = "expenseCount";
pub const SAVING_COUNT: &str = "savingCount";
pub const FEED_COUNT: &str = "feedCount";

pub type CounterMap = HashMap<String, i64>;

/// Mission variants. The legacy tags `expense_tracking` / `saving_tracking`
/// are accepted as aliases for the corresponding logging missions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    LogExpenses,
    LogSavings,
    Combined,
    TamagotchiCare,
}

impl MissionKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "log_expenses" | "expense_tracking" => Some(MissionKind::LogExpenses),
            "log_savings" | "saving_tracking" => Some(MissionKind::LogSavings),
            "combined" => Some(MissionKind::Combined),
            "tamagotchi_care" => Some(MissionKind::TamagotchiCare),
            _ => None,
        }
    }

    #[allow(dead_code)]
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionKind::LogExpenses => "log_expenses",
            MissionKind::LogSavings => "log_savings",
            MissionKind::Combined => "combined",
            MissionKind::TamagotchiCare => "tamagotchi_care",
        }
    }
}

/// Catalog mission; exactly one is expected per active UTC date.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "missionType")]
    pub kind: MissionKind,
    pub requirements: CounterMap,
    pub reward_coins: Decimal,
    pub active_date: NaiveDate,
}

/// Per-user mission state, created lazily on first contact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mission_id: Uuid,
    pub progress: CounterMap,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Append-only expense record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// Append-only saving record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Saving {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub source: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// What a progress bump did inside an activity transaction.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    #[allow(dead_code)]
    pub user_mission_id: Uuid,
    #[allow(dead_code)]
    pub progress: CounterMap,
    pub progress_pct: f64,
    pub completed: bool,
    /// Reward credited by this very update. `None` both before completion
    /// and on any log after it - the credit happens exactly once.
    pub reward_credited: Option<Decimal>,
}

// ============================================================================
// PROGRESS RULES
// ============================================================================

/// Percentage of a mission satisfied by the given counters, clamped to 100.
///
/// A missing or non-positive requirement counts as satisfied: such a mission
/// demands nothing on that axis.
pub fn progress_pct(kind: MissionKind, requirements: &CounterMap, progress: &CounterMap) -> f64 {
    fn ratio(requirements: &CounterMap, progress: &CounterMap, key: &str) -> f64 {
        let required = requirements.get(key).copied().unwrap_or(0);
        if required <= 0 {
            return 100.0;
        }
        let done = progress.get(key).copied().unwrap_or(0);
        (100.0 * done as f64 / required as f64).min(100.0)
    }

    match kind {
        MissionKind::LogExpenses => ratio(requirements, progress, EXPENSE_COUNT),
        MissionKind::LogSavings => ratio(requirements, progress, SAVING_COUNT),
        MissionKind::Combined => {
            (ratio(requirements, progress, EXPENSE_COUNT)
                + ratio(requirements, progress, SAVING_COUNT))
                / 2.0
        }
        MissionKind::TamagotchiCare => ratio(requirements, progress, FEED_COUNT),
    }
}

/// Applies one counter bump and decides whether it completes the mission.
/// Pure so the stores can run it inside their transactions. Must only be
/// called for a not-yet-completed user mission.
pub fn bump_progress(
    mission: &Mission,
    current: &CounterMap,
    key: &str,
) -> (CounterMap, f64, bool) {
    let mut progress = current.clone();
    *progress.entry(key.to_string()).or_insert(0) += 1;
    let pct = progress_pct(mission.kind, &mission.requirements, &progress);
    (progress, pct, pct >= 100.0)
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

#[async_trait]
pub trait MissionStore: Send + Sync {
    /// The mission whose `active_date` equals the given UTC day.
    async fn mission_for_date(&self, date: NaiveDate) -> Result<Option<Mission>, GameError>;

    /// Fetch the user's state for a mission, inserting an empty one if absent.
    async fn get_or_create_user_mission(
        &self,
        user_id: Uuid,
        mission_id: Uuid,
    ) -> Result<UserMission, GameError>;

    /// One transaction: insert the expense row and, when a mission is
    /// supplied, bump its progress (crediting the reward on the completing
    /// bump).
    async fn record_expense(
        &self,
        user_id: Uuid,
        amount: Decimal,
        category: &str,
        description: Option<&str>,
        mission: Option<&Mission>,
    ) -> Result<(Expense, Option<ProgressUpdate>), GameError>;

    /// Saving-side twin of `record_expense`.
    async fn record_saving(
        &self,
        user_id: Uuid,
        amount: Decimal,
        source: Option<&str>,
        mission: Option<&Mission>,
    ) -> Result<(Saving, Option<ProgressUpdate>), GameError>;

    async fn expenses(&self, user_id: Uuid, limit: i64) -> Result<Vec<Expense>, GameError>;

    async fn savings(&self, user_id: Uuid, limit: i64) -> Result<Vec<Saving>, GameError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Today's mission together with the caller's progress.
#[derive(Debug, Clone)]
pub struct TodaysMission {
    pub mission: Mission,
    pub user_mission: UserMission,
    pub progress_pct: f64,
}

/// Result of logging an activity. When no mission is active today the
/// activity still lands and the mission fields read zero / false.
#[derive(Debug, Clone)]
pub struct ActivityOutcome<T> {
    pub record: T,
    pub mission_progress: f64,
    pub mission_completed: bool,
    pub reward_credited: Option<Decimal>,
}

const HISTORY_LIMIT: i64 = 50;

pub struct MissionService<S: MissionStore> {
    store: S,
}

impl<S: MissionStore> MissionService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The mission active on the current UTC day, if any.
    pub async fn active_mission(&self) -> Result<Option<Mission>, GameError> {
        self.store
            .mission_for_date(Utc::now().date_naive())
            .await
    }

    /// Today's mission plus the caller's (lazily created) progress record.
    pub async fn todays_mission(&self, user_id: Uuid) -> Result<TodaysMission, GameError> {
        let mission = self
            .active_mission()
            .await?
            .ok_or(GameError::NoActiveMission)?;
        let user_mission = self
            .store
            .get_or_create_user_mission(user_id, mission.id)
            .await?;
        let pct = progress_pct(mission.kind, &mission.requirements, &user_mission.progress);
        Ok(TodaysMission {
            mission,
            user_mission,
            progress_pct: pct,
        })
    }

    /// Log an expense. Never fails for an absent mission - the activity row
    /// is appended regardless.
    pub async fn log_expense(
        &self,
        user_id: Uuid,
        amount: Decimal,
        category: &str,
        description: Option<&str>,
    ) -> Result<ActivityOutcome<Expense>, GameError> {
        ensure_positive(amount)?;
        let mission = self.active_mission().await?;
        let (expense, update) = self
            .store
            .record_expense(user_id, amount, category, description, mission.as_ref())
            .await?;
        Ok(outcome(expense, update))
    }

    pub async fn log_saving(
        &self,
        user_id: Uuid,
        amount: Decimal,
        source: Option<&str>,
    ) -> Result<ActivityOutcome<Saving>, GameError> {
        ensure_positive(amount)?;
        let mission = self.active_mission().await?;
        let (saving, update) = self
            .store
            .record_saving(user_id, amount, source, mission.as_ref())
            .await?;
        Ok(outcome(saving, update))
    }

    pub async fn expense_history(&self, user_id: Uuid) -> Result<Vec<Expense>, GameError> {
        self.store.expenses(user_id, HISTORY_LIMIT).await
    }

    pub async fn saving_history(&self, user_id: Uuid) -> Result<Vec<Saving>, GameError> {
        self.store.savings(user_id, HISTORY_LIMIT).await
    }
}

fn outcome<T>(record: T, update: Option<ProgressUpdate>) -> ActivityOutcome<T> {
    match update {
        Some(update) => {
            if let Some(reward) = update.reward_credited {
                tracing::info!(reward = %reward, "mission completed, reward credited");
            }
            ActivityOutcome {
                record,
                mission_progress: update.progress_pct,
                mission_completed: update.completed,
                reward_credited: update.reward_credited,
            }
        }
        None => ActivityOutcome {
            record,
            mission_progress: 0.0,
            mission_completed: false,
            reward_credited: None,
        },
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), GameError> {
    if amount <= Decimal::ZERO {
        return Err(GameError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    pub(crate) fn mission(kind: MissionKind, requirements: &[(&str, i64)]) -> Mission {
        Mission {
            id: Uuid::new_v4(),
            title: "Daily mission".to_string(),
            description: "Do the thing".to_string(),
            kind,
            requirements: requirements
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            reward_coins: dec!(10),
            active_date: Utc::now().date_naive(),
        }
    }

    /// In-memory mission store. Reward credits are recorded as
    /// `ProgressUpdate::reward_credited` plus an entry in `credits` so tests
    /// can assert exactly-once behavior.
    pub(crate) struct InMemoryMissionStore {
        pub mission: Option<Mission>,
        pub user_missions: Arc<Mutex<Vec<UserMission>>>,
        pub expenses: Arc<Mutex<Vec<Expense>>>,
        pub savings: Arc<Mutex<Vec<Saving>>>,
        pub credits: Arc<Mutex<Vec<Decimal>>>,
    }

    impl InMemoryMissionStore {
        pub fn new(mission: Option<Mission>) -> Self {
            Self {
                mission,
                user_missions: Arc::new(Mutex::new(Vec::new())),
                expenses: Arc::new(Mutex::new(Vec::new())),
                savings: Arc::new(Mutex::new(Vec::new())),
                credits: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn upsert_user_mission(&self, user_id: Uuid, mission_id: Uuid) -> UserMission {
            let mut missions = self.user_missions.lock().unwrap();
            if let Some(existing) = missions
                .iter()
                .find(|m| m.user_id == user_id && m.mission_id == mission_id)
            {
                return existing.clone();
            }
            let fresh = UserMission {
                id: Uuid::new_v4(),
                user_id,
                mission_id,
                progress: CounterMap::new(),
                completed: false,
                completed_at: None,
                created_at: Utc::now(),
            };
            missions.push(fresh.clone());
            fresh
        }

        /// Mirrors the transactional bump of the PostgreSQL store.
        pub(crate) fn apply_bump(
            &self,
            user_id: Uuid,
            mission: &Mission,
            key: &str,
        ) -> ProgressUpdate {
            let current = self.upsert_user_mission(user_id, mission.id);
            if current.completed {
                return ProgressUpdate {
                    user_mission_id: current.id,
                    progress: current.progress,
                    progress_pct: 100.0,
                    completed: true,
                    reward_credited: None,
                };
            }

            let (progress, pct, just_completed) = bump_progress(mission, &current.progress, key);
            let mut missions = self.user_missions.lock().unwrap();
            let record = missions.iter_mut().find(|m| m.id == current.id).unwrap();
            record.progress = progress.clone();
            if just_completed {
                record.completed = true;
                record.completed_at = Some(Utc::now());
                self.credits.lock().unwrap().push(mission.reward_coins);
            }
            ProgressUpdate {
                user_mission_id: current.id,
                progress,
                progress_pct: pct,
                completed: just_completed,
                reward_credited: just_completed.then_some(mission.reward_coins),
            }
        }
    }

    #[async_trait]
    impl MissionStore for InMemoryMissionStore {
        async fn mission_for_date(&self, date: NaiveDate) -> Result<Option<Mission>, GameError> {
            Ok(self
                .mission
                .clone()
                .filter(|m| m.active_date == date))
        }

        async fn get_or_create_user_mission(
            &self,
            user_id: Uuid,
            mission_id: Uuid,
        ) -> Result<UserMission, GameError> {
            Ok(self.upsert_user_mission(user_id, mission_id))
        }

        async fn record_expense(
            &self,
            user_id: Uuid,
            amount: Decimal,
            category: &str,
            description: Option<&str>,
            mission: Option<&Mission>,
        ) -> Result<(Expense, Option<ProgressUpdate>), GameError> {
            let expense = Expense {
                id: Uuid::new_v4(),
                user_id,
                amount,
                category: category.to_string(),
                description: description.map(str::to_string),
                logged_at: Utc::now(),
            };
            self.expenses.lock().unwrap().push(expense.clone());
            let update = mission.map(|m| self.apply_bump(user_id, m, EXPENSE_COUNT));
            Ok((expense, update))
        }

        async fn record_saving(
            &self,
            user_id: Uuid,
            amount: Decimal,
            source: Option<&str>,
            mission: Option<&Mission>,
        ) -> Result<(Saving, Option<ProgressUpdate>), GameError> {
            let saving = Saving {
                id: Uuid::new_v4(),
                user_id,
                amount,
                source: source.map(str::to_string),
                logged_at: Utc::now(),
            };
            self.savings.lock().unwrap().push(saving.clone());
            let update = mission.map(|m| self.apply_bump(user_id, m, SAVING_COUNT));
            Ok((saving, update))
        }

        async fn expenses(&self, user_id: Uuid, limit: i64) -> Result<Vec<Expense>, GameError> {
            Ok(self
                .expenses
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.user_id == user_id)
                .rev()
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn savings(&self, user_id: Uuid, limit: i64) -> Result<Vec<Saving>, GameError> {
            Ok(self
                .savings
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.user_id == user_id)
                .rev()
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    #[test]
    fn progress_pct_clamps_and_averages() {
        let requirements: CounterMap = [(EXPENSE_COUNT.to_string(), 4), (SAVING_COUNT.to_string(), 2)]
            .into_iter()
            .collect();
        let progress: CounterMap = [(EXPENSE_COUNT.to_string(), 2), (SAVING_COUNT.to_string(), 5)]
            .into_iter()
            .collect();

        assert_eq!(
            progress_pct(MissionKind::LogExpenses, &requirements, &progress),
            50.0
        );
        // The saving ratio clamps at 100 before averaging.
        assert_eq!(
            progress_pct(MissionKind::Combined, &requirements, &progress),
            75.0
        );
        assert_eq!(
            progress_pct(MissionKind::LogSavings, &requirements, &progress),
            100.0
        );
    }

    #[test]
    fn empty_requirement_counts_as_satisfied() {
        let requirements = CounterMap::new();
        let progress = CounterMap::new();
        assert_eq!(
            progress_pct(MissionKind::TamagotchiCare, &requirements, &progress),
            100.0
        );
    }

    #[test]
    fn legacy_mission_tags_parse() {
        assert_eq!(
            MissionKind::parse("expense_tracking"),
            Some(MissionKind::LogExpenses)
        );
        assert_eq!(
            MissionKind::parse("saving_tracking"),
            Some(MissionKind::LogSavings)
        );
        assert_eq!(MissionKind::parse("daily_quiz"), None);
    }

    #[tokio::test]
    async fn third_expense_completes_and_credits_exactly_once() {
        let mission = mission(MissionKind::LogExpenses, &[(EXPENSE_COUNT, 3)]);
        let service = MissionService::new(InMemoryMissionStore::new(Some(mission)));
        let user = Uuid::new_v4();

        for expected in [
            (100.0 / 3.0, false),
            (200.0 / 3.0, false),
            (100.0, true),
        ] {
            let out = service
                .log_expense(user, dec!(1), "snack", None)
                .await
                .unwrap();
            assert!((out.mission_progress - expected.0).abs() < 1e-9);
            assert_eq!(out.mission_completed, expected.1);
        }

        // Fourth log: expense recorded, still completed, no second credit.
        let out = service
            .log_expense(user, dec!(1), "snack", None)
            .await
            .unwrap();
        assert!(out.mission_completed);
        assert_eq!(out.reward_credited, None);
        assert_eq!(service.store.expenses.lock().unwrap().len(), 4);
        assert_eq!(service.store.credits.lock().unwrap().as_slice(), &[dec!(10)]);
    }

    #[tokio::test]
    async fn logging_without_active_mission_still_records() {
        let service = MissionService::new(InMemoryMissionStore::new(None));
        let user = Uuid::new_v4();

        let out = service
            .log_saving(user, dec!(20), Some("allowance"))
            .await
            .unwrap();
        assert_eq!(out.mission_progress, 0.0);
        assert!(!out.mission_completed);
        assert_eq!(service.saving_history(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn todays_mission_creates_user_record_lazily() {
        let mission = mission(MissionKind::LogSavings, &[(SAVING_COUNT, 2)]);
        let service = MissionService::new(InMemoryMissionStore::new(Some(mission)));
        let user = Uuid::new_v4();

        let today = service.todays_mission(user).await.unwrap();
        assert_eq!(today.progress_pct, 0.0);
        assert!(!today.user_mission.completed);
        assert_eq!(service.store.user_missions.lock().unwrap().len(), 1);

        // Second fetch reuses the record.
        service.todays_mission(user).await.unwrap();
        assert_eq!(service.store.user_missions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_mission_today_is_surfaced_on_fetch() {
        let stale = Mission {
            active_date: Utc::now().date_naive().pred_opt().unwrap(),
            ..mission(MissionKind::LogExpenses, &[(EXPENSE_COUNT, 1)])
        };
        let service = MissionService::new(InMemoryMissionStore::new(Some(stale)));
        let err = service.todays_mission(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, GameError::NoActiveMission));
    }

    #[tokio::test]
    async fn combined_mission_needs_both_activities() {
        let mission = mission(
            MissionKind::Combined,
            &[(EXPENSE_COUNT, 1), (SAVING_COUNT, 1)],
        );
        let service = MissionService::new(InMemoryMissionStore::new(Some(mission)));
        let user = Uuid::new_v4();

        let out = service
            .log_expense(user, dec!(5), "toy", None)
            .await
            .unwrap();
        assert_eq!(out.mission_progress, 50.0);
        assert!(!out.mission_completed);

        let out = service.log_saving(user, dec!(5), None).await.unwrap();
        assert_eq!(out.mission_progress, 100.0);
        assert!(out.mission_completed);
        assert_eq!(out.reward_credited, Some(dec!(10)));
    }
}
