// /adventure endpoints: the two orchestrator operations plus history reads.
// Both trace ids ride on the serialized adventure so callers can hand them
// to operators.

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::adventure::Adventure;
use crate::http::error::{ApiError, OrApiErr};
use crate::http::state::{AppState, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub context: Option<String>,
}

pub async fn generate(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<Adventure>), ApiError> {
    let recent_activities = recent_activity_lines(&state, user_id).await.or_api(uri.path())?;
    let adventure = state
        .adventures
        .generate(user_id, body.context.as_deref(), recent_activities)
        .await
        .or_api(uri.path())?;
    Ok((StatusCode::CREATED, Json(adventure)))
}

/// A short window of recent activity for the generation prompt: the last few
/// expenses and savings, newest first, capped at five lines.
async fn recent_activity_lines(
    state: &AppState,
    user_id: Uuid,
) -> Result<Vec<String>, crate::core::error::GameError> {
    let mut lines = Vec::new();
    for expense in state.missions.expense_history(user_id).await?.into_iter().take(3) {
        lines.push(format!("Spent {} on {}", expense.amount, expense.category));
    }
    for saving in state.missions.saving_history(user_id).await?.into_iter().take(2) {
        match saving.source {
            Some(source) => lines.push(format!("Saved {} from {}", saving.amount, source)),
            None => lines.push(format!("Saved {}", saving.amount)),
        }
    }
    lines.truncate(5);
    Ok(lines)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitChoiceRequest {
    pub adventure_id: Uuid,
    pub choice_index: i32,
}

pub async fn submit_choice(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<SubmitChoiceRequest>,
) -> Result<Json<Adventure>, ApiError> {
    let adventure = state
        .adventures
        .submit_choice(user_id, body.adventure_id, body.choice_index)
        .await
        .or_api(uri.path())?;
    Ok(Json(adventure))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AdventuresResponse {
    pub adventures: Vec<Adventure>,
}

pub async fn history(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<AdventuresResponse>, ApiError> {
    let adventures = state
        .adventures
        .history(user_id, params.limit)
        .await
        .or_api(uri.path())?;
    Ok(Json(AdventuresResponse { adventures }))
}

pub async fn get_one(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(adventure_id): Path<Uuid>,
) -> Result<Json<Adventure>, ApiError> {
    let adventure = state
        .adventures
        .get(user_id, adventure_id)
        .await
        .or_api(uri.path())?;
    Ok(Json(adventure))
}
