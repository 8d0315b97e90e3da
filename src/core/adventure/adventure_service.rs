// Adventure engine - the two-phase money-adventure orchestrator.
//
// Each adventure is a write-once state machine: Generate leaves it
// unsubmitted, SubmitChoice moves it to evaluated in a single storage write
// (choice, feedback, scores, trace id, timestamp together). An AI failure
// after retries leaves the record unsubmitted so the client can try again.
// Both AI responses carry an opik trace id which is persisted and echoed so
// operators can correlate player events with the external traces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::error::GameError;
use super::goal::{Goal, GoalFilter, GoalStore};
use super::profile::ProfileStore;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Adventure {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scenario: String,
    pub choices: Vec<String>,
    pub selected_choice_index: Option<i32>,
    pub feedback: Option<String>,
    /// Free-form map of named metric scores in [0, 1]; no fixed key set.
    pub scores: Option<HashMap<String, f64>>,
    pub generation_trace_id: String,
    pub evaluation_trace_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// AI CLIENT CONTRACT
// ============================================================================

/// Outbound request for a fresh scenario.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateAdventureRequest {
    pub user_age: i32,
    pub allowance: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_activities: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedAdventure {
    pub scenario: String,
    pub choices: Vec<String>,
    pub opik_trace_id: String,
}

/// Outbound request scoring one selected choice.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateChoiceRequest {
    pub scenario: String,
    pub choice_index: i32,
    pub choice_text: String,
    pub user_age: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceEvaluation {
    pub feedback: String,
    pub scores: HashMap<String, f64>,
    pub opik_trace_id: String,
}

/// The external AI subsystem. Implemented over HTTP in `infra`; the retry
/// and backoff policy lives behind this trait.
#[async_trait]
pub trait AdventureAi: Send + Sync {
    async fn generate(
        &self,
        request: &GenerateAdventureRequest,
    ) -> Result<GeneratedAdventure, GameError>;

    async fn evaluate(
        &self,
        request: &EvaluateChoiceRequest,
    ) -> Result<ChoiceEvaluation, GameError>;
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

#[async_trait]
pub trait AdventureStore: Send + Sync {
    async fn insert(&self, adventure: Adventure) -> Result<Adventure, GameError>;

    async fn find(&self, id: Uuid, user_id: Uuid) -> Result<Option<Adventure>, GameError>;

    /// Newest first.
    async fn history(&self, user_id: Uuid, limit: i64) -> Result<Vec<Adventure>, GameError>;

    /// The write-once transition to evaluated. All evaluation fields land in
    /// one write guarded on the unsubmitted state; a lost race surfaces as
    /// `AlreadySubmitted`.
    async fn record_evaluation(
        &self,
        id: Uuid,
        user_id: Uuid,
        choice_index: i32,
        evaluation: &ChoiceEvaluation,
        evaluated_at: DateTime<Utc>,
    ) -> Result<Adventure, GameError>;
}

// ============================================================================
// CONTEXT BUILDING
// ============================================================================

/// How many incomplete goals feed the generation prompt.
const GOAL_CONTEXT_LIMIT: usize = 3;

/// Builds the goal-context line sent to the AI from the player's most recent
/// incomplete goals plus any caller-supplied context.
pub fn build_goal_context(goals: &[Goal], extra: Option<&str>) -> Option<String> {
    let mut parts: Vec<String> = goals
        .iter()
        .take(GOAL_CONTEXT_LIMIT)
        .map(|g| {
            format!(
                "{} ({} / {})",
                g.title, g.current_amount, g.target_amount
            )
        })
        .collect();
    if let Some(extra) = extra.map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(extra.to_string());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

pub struct AdventureService<S, A, P, G>
where
    S: AdventureStore,
    A: AdventureAi,
    P: ProfileStore,
    G: GoalStore,
{
    store: S,
    ai: A,
    profiles: P,
    goals: G,
}

impl<S, A, P, G> AdventureService<S, A, P, G>
where
    S: AdventureStore,
    A: AdventureAi,
    P: ProfileStore,
    G: GoalStore,
{
    pub fn new(store: S, ai: A, profiles: P, goals: G) -> Self {
        Self {
            store,
            ai,
            profiles,
            goals,
        }
    }

    /// Phase one: generate a fresh scenario. Not idempotent - every call
    /// produces a new adventure.
    pub async fn generate(
        &self,
        user_id: Uuid,
        context: Option<&str>,
        recent_activities: Vec<String>,
    ) -> Result<Adventure, GameError> {
        let profile = self
            .profiles
            .find(user_id)
            .await?
            .ok_or(GameError::NotFound("profile"))?;
        let goals = self.goals.list(user_id, GoalFilter::Active).await?;

        let request = GenerateAdventureRequest {
            user_age: profile.age,
            allowance: profile.allowance,
            goal_context: build_goal_context(&goals, context),
            recent_activities: (!recent_activities.is_empty()).then_some(recent_activities),
        };
        let generated = self.ai.generate(&request).await?;
        if generated.choices.len() < 2 {
            return Err(GameError::ServiceUnavailable(
                "adventure service returned fewer than two choices".to_string(),
            ));
        }

        tracing::info!(
            user_id = %user_id,
            trace_id = %generated.opik_trace_id,
            "adventure generated"
        );
        self.store
            .insert(Adventure {
                id: Uuid::new_v4(),
                user_id,
                scenario: generated.scenario,
                choices: generated.choices,
                selected_choice_index: None,
                feedback: None,
                scores: None,
                generation_trace_id: generated.opik_trace_id,
                evaluation_trace_id: None,
                created_at: Utc::now(),
                evaluated_at: None,
            })
            .await
    }

    /// Phase two: the one-shot transition from unsubmitted to evaluated.
    pub async fn submit_choice(
        &self,
        user_id: Uuid,
        adventure_id: Uuid,
        choice_index: i32,
    ) -> Result<Adventure, GameError> {
        let adventure = self
            .store
            .find(adventure_id, user_id)
            .await?
            .ok_or(GameError::NotFound("adventure"))?;
        if adventure.selected_choice_index.is_some() {
            return Err(GameError::AlreadySubmitted);
        }
        let choice_text = usize::try_from(choice_index)
            .ok()
            .and_then(|i| adventure.choices.get(i))
            .ok_or(GameError::InvalidChoice {
                index: choice_index,
                choices: adventure.choices.len(),
            })?
            .clone();

        let profile = self
            .profiles
            .find(user_id)
            .await?
            .ok_or(GameError::NotFound("profile"))?;
        let evaluation = self
            .ai
            .evaluate(&EvaluateChoiceRequest {
                scenario: adventure.scenario.clone(),
                choice_index,
                choice_text,
                user_age: profile.age,
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            adventure_id = %adventure_id,
            trace_id = %evaluation.opik_trace_id,
            "adventure evaluated"
        );
        self.store
            .record_evaluation(adventure_id, user_id, choice_index, &evaluation, Utc::now())
            .await
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Adventure, GameError> {
        self.store
            .find(id, user_id)
            .await?
            .ok_or(GameError::NotFound("adventure"))
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Adventure>, GameError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        self.store.history(user_id, limit).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
