// /wallet endpoints: balance and the ledger history.

use axum::extract::{OriginalUri, Query, State};
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::profile::DEFAULT_CURRENCY;
use crate::core::wallet::WalletTransaction;
use crate::http::error::{ApiError, OrApiErr};
use crate::http::state::{AppState, CurrentUser};

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub balance: Decimal,
    pub currency: String,
}

pub async fn get_wallet(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state.wallets.balance(user_id).await.or_api(uri.path())?;
    // Currency lives on the profile; a player who has not onboarded yet
    // still sees a wallet in the default currency.
    let currency = match state.profiles.get_profile(user_id).await {
        Ok(profile) => profile.currency,
        Err(_) => DEFAULT_CURRENCY.to_string(),
    };
    Ok(Json(WalletResponse {
        balance: wallet.balance,
        currency,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub transactions: Vec<WalletTransaction>,
}

pub async fn history(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let transactions = state
        .wallets
        .history(user_id, params.limit)
        .await
        .or_api(uri.path())?;
    Ok(Json(HistoryResponse { transactions }))
}
