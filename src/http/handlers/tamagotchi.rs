// /tamagotchi endpoints: state read, feeding and renaming.

use axum::extract::{OriginalUri, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::tamagotchi::Tamagotchi;
use crate::http::error::{ApiError, OrApiErr};
use crate::http::state::{AppState, CurrentUser};

pub async fn get_state(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Tamagotchi>, ApiError> {
    let pet = state.tamagotchi.get(user_id).await.or_api(uri.path())?;
    Ok(Json(pet))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRequest {
    pub food_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub hunger: i32,
    pub happiness: i32,
    pub health: i32,
}

pub async fn feed(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<FeedRequest>,
) -> Result<Json<FeedResponse>, ApiError> {
    let food = state.shop.get_food(body.food_id).await.or_api(uri.path())?;
    let active_mission = state.missions.active_mission().await.or_api(uri.path())?;
    let outcome = state
        .tamagotchi
        .feed(user_id, &food, active_mission.as_ref())
        .await
        .or_api(uri.path())?;
    Ok(Json(FeedResponse {
        hunger: outcome.tamagotchi.hunger,
        happiness: outcome.tamagotchi.happiness,
        health: outcome.tamagotchi.health,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

pub async fn rename(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<RenameRequest>,
) -> Result<Json<Tamagotchi>, ApiError> {
    let pet = state
        .tamagotchi
        .rename(user_id, &body.name)
        .await
        .or_api(uri.path())?;
    Ok(Json(pet))
}
