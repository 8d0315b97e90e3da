// /goals endpoints: CRUD plus the progress transaction.

use axum::extract::{OriginalUri, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::goal::{Goal, GoalFilter};
use crate::http::error::{ApiError, OrApiErr};
use crate::http::state::{AppState, CurrentUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    pub title: String,
    pub description: Option<String>,
    pub target_amount: Decimal,
}

pub async fn create(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    let goal = state
        .goals
        .create(
            user_id,
            &body.title,
            body.description.as_deref(),
            body.target_amount,
        )
        .await
        .or_api(uri.path())?;
    Ok((StatusCode::CREATED, Json(goal)))
}

#[derive(Debug, Serialize)]
pub struct GoalsResponse {
    pub goals: Vec<Goal>,
}

async fn list(
    state: &AppState,
    uri: &axum::http::Uri,
    user_id: Uuid,
    filter: GoalFilter,
) -> Result<Json<GoalsResponse>, ApiError> {
    let goals = state.goals.list(user_id, filter).await.or_api(uri.path())?;
    Ok(Json(GoalsResponse { goals }))
}

pub async fn list_all(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<GoalsResponse>, ApiError> {
    list(&state, &uri, user_id, GoalFilter::All).await
}

pub async fn list_active(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<GoalsResponse>, ApiError> {
    list(&state, &uri, user_id, GoalFilter::Active).await
}

pub async fn list_completed(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<GoalsResponse>, ApiError> {
    list(&state, &uri, user_id, GoalFilter::Completed).await
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_awarded: Option<Decimal>,
}

pub async fn add_progress(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(goal_id): Path<Uuid>,
    Json(body): Json<ProgressRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let outcome = state
        .goals
        .add_progress(goal_id, user_id, body.amount)
        .await
        .or_api(uri.path())?;
    Ok(Json(ProgressResponse {
        goal: outcome.goal,
        progress_pct: outcome.progress_pct,
        bonus_awarded: outcome.bonus_awarded,
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

pub async fn remove(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state
        .goals
        .delete(goal_id, user_id)
        .await
        .or_api(uri.path())?;
    Ok(Json(DeleteResponse { success: true }))
}
