// /auth endpoints: register and login, the two unauthenticated entry points.

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::error::{ApiError, OrApiErr};
use crate::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = state
        .auth
        .register(&body.username, &body.email, &body.password)
        .await
        .or_api(uri.path())?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user_id: session.user_id,
            token: session.token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .auth
        .login(&body.username, &body.password)
        .await
        .or_api(uri.path())?;
    Ok(Json(SessionResponse {
        user_id: session.user_id,
        token: session.token,
    }))
}
