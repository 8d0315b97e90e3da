// /shop endpoints: catalog reads, the user inventory and purchases.

use axum::extract::{OriginalUri, State};
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shop::{Character, Food, InventoryEntry, ItemKind, ShopItem};
use crate::http::error::{ApiError, OrApiErr};
use crate::http::state::{AppState, CurrentUser};

#[derive(Debug, Serialize)]
pub struct CharactersResponse {
    pub characters: Vec<Character>,
}

#[derive(Debug, Serialize)]
pub struct FoodsResponse {
    pub foods: Vec<Food>,
}

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub inventory: Vec<InventoryEntry>,
}

pub async fn characters(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<CharactersResponse>, ApiError> {
    let characters = state.shop.list_characters().await.or_api(uri.path())?;
    Ok(Json(CharactersResponse { characters }))
}

pub async fn foods(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<FoodsResponse>, ApiError> {
    let foods = state.shop.list_foods().await.or_api(uri.path())?;
    Ok(Json(FoodsResponse { foods }))
}

pub async fn inventory(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let inventory = state.shop.inventory(user_id).await.or_api(uri.path())?;
    Ok(Json(InventoryResponse { inventory }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    pub item_id: Uuid,
    pub item_type: ItemKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyResponse {
    pub success: bool,
    pub new_balance: Decimal,
    pub item: ShopItem,
}

pub async fn buy(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<BuyRequest>,
) -> Result<Json<BuyResponse>, ApiError> {
    let receipt = state
        .shop
        .purchase(user_id, body.item_id, body.item_type)
        .await
        .or_api(uri.path())?;
    Ok(Json(BuyResponse {
        success: true,
        new_balance: receipt.new_balance,
        item: receipt.item,
    }))
}
