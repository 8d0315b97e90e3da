// The auth gate: verifies the bearer credential on every protected route
// and attaches the authenticated user id to the request. Stateless - the
// token is validated by signature alone, no storage round-trip.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::core::error::GameError;
use crate::http::error::ApiError;
use crate::http::state::{AppState, CurrentUser};

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let Some(token) = token else {
        return ApiError::from_game(GameError::Unauthorized, &path).into_response();
    };

    match state.auth.resolve_principal(token) {
        Ok(user_id) => {
            request.extensions_mut().insert(CurrentUser(user_id));
            next.run(request).await
        }
        Err(err) => ApiError::from_game(err, &path).into_response(),
    }
}
