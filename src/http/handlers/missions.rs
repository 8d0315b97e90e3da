// /missions endpoints: today's mission, activity logging and the history
// reads.

use axum::extract::{OriginalUri, State};
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::mission::{Expense, Mission, Saving, UserMission};
use crate::http::error::{ApiError, OrApiErr};
use crate::http::state::{AppState, CurrentUser};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayResponse {
    pub mission: Mission,
    pub user_mission: UserMission,
    pub progress_pct: f64,
}

pub async fn today(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<TodayResponse>, ApiError> {
    let today = state
        .missions
        .todays_mission(user_id)
        .await
        .or_api(uri.path())?;
    Ok(Json(TodayResponse {
        mission: today.mission,
        user_mission: today.user_mission,
        progress_pct: today.progress_pct,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LogExpenseRequest {
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogExpenseResponse {
    pub logged: bool,
    pub expense: Expense,
    pub mission_progress: f64,
    pub mission_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_coins: Option<Decimal>,
}

pub async fn log_expense(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<LogExpenseRequest>,
) -> Result<Json<LogExpenseResponse>, ApiError> {
    let outcome = state
        .missions
        .log_expense(
            user_id,
            body.amount,
            body.category.trim(),
            body.description.as_deref(),
        )
        .await
        .or_api(uri.path())?;
    Ok(Json(LogExpenseResponse {
        logged: true,
        expense: outcome.record,
        mission_progress: outcome.mission_progress,
        mission_completed: outcome.mission_completed,
        reward_coins: outcome.reward_credited,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LogSavingRequest {
    pub amount: Decimal,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSavingResponse {
    pub logged: bool,
    pub saving: Saving,
    pub mission_progress: f64,
    pub mission_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_coins: Option<Decimal>,
}

pub async fn log_saving(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<LogSavingRequest>,
) -> Result<Json<LogSavingResponse>, ApiError> {
    let outcome = state
        .missions
        .log_saving(user_id, body.amount, body.source.as_deref())
        .await
        .or_api(uri.path())?;
    Ok(Json(LogSavingResponse {
        logged: true,
        saving: outcome.record,
        mission_progress: outcome.mission_progress,
        mission_completed: outcome.mission_completed,
        reward_coins: outcome.reward_credited,
    }))
}

#[derive(Debug, Serialize)]
pub struct ExpensesResponse {
    pub expenses: Vec<Expense>,
}

pub async fn expenses(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<ExpensesResponse>, ApiError> {
    let expenses = state
        .missions
        .expense_history(user_id)
        .await
        .or_api(uri.path())?;
    Ok(Json(ExpensesResponse { expenses }))
}

#[derive(Debug, Serialize)]
pub struct SavingsResponse {
    pub savings: Vec<Saving>,
}

pub async fn savings(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<SavingsResponse>, ApiError> {
    let savings = state
        .missions
        .saving_history(user_id)
        .await
        .or_api(uri.path())?;
    Ok(Json(SavingsResponse { savings }))
}
