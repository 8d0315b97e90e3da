// /profile and /characters endpoints: profile CRUD and the starter-choice
// onboarding step.

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::profile::Profile;
use crate::core::shop::Character;
use crate::core::tamagotchi::Tamagotchi;
use crate::http::error::{ApiError, OrApiErr};
use crate::http::state::{AppState, CurrentUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub age: i32,
    pub allowance: Decimal,
    pub currency: Option<String>,
}

pub async fn create_profile(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let profile = state
        .profiles
        .create_profile(user_id, body.age, body.allowance, body.currency.as_deref())
        .await
        .or_api(uri.path())?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn get_profile(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.profiles.get_profile(user_id).await.or_api(uri.path())?;
    Ok(Json(profile))
}

#[derive(Debug, Serialize)]
pub struct CharactersResponse {
    pub characters: Vec<Character>,
}

pub async fn starter_characters(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<CharactersResponse>, ApiError> {
    let characters = state
        .shop
        .list_starter_characters()
        .await
        .or_api(uri.path())?;
    Ok(Json(CharactersResponse { characters }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChooseCharacterRequest {
    pub character_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChooseCharacterResponse {
    pub tamagotchi_id: Uuid,
    pub tamagotchi: Tamagotchi,
    pub character: Character,
}

pub async fn choose_character(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<ChooseCharacterRequest>,
) -> Result<(StatusCode, Json<ChooseCharacterResponse>), ApiError> {
    let character = state
        .shop
        .get_character(body.character_id)
        .await
        .or_api(uri.path())?;
    let outcome = state
        .profiles
        .choose_starter(user_id, character)
        .await
        .or_api(uri.path())?;
    Ok((
        StatusCode::CREATED,
        Json(ChooseCharacterResponse {
            tamagotchi_id: outcome.tamagotchi.id,
            tamagotchi: outcome.tamagotchi,
            character: outcome.character,
        }),
    ))
}
