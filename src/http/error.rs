// The uniform error envelope. Core components raise GameError kinds; this
// module owns the status mapping and the response body:
// {statusCode, message, error, timestamp, path, validationErrors?}.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::core::error::{FieldError, GameError};

pub fn status_for(err: &GameError) -> StatusCode {
    match err {
        GameError::Unauthorized => StatusCode::UNAUTHORIZED,
        GameError::Forbidden(_) => StatusCode::FORBIDDEN,
        GameError::NotFound(_) => StatusCode::NOT_FOUND,
        GameError::Conflict(_) | GameError::AlreadySubmitted | GameError::AlreadyCompleted => {
            StatusCode::CONFLICT
        }
        GameError::InvalidAmount(_)
        | GameError::InvalidChoice { .. }
        | GameError::InvalidStarter
        | GameError::InsufficientFunds { .. }
        | GameError::InsufficientQuantity { .. }
        | GameError::NoActiveMission
        | GameError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        GameError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GameError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    path: String,
    validation: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn from_game(err: GameError, path: &str) -> Self {
        // Internal detail stays in the logs; the envelope carries a generic
        // message.
        let message = match &err {
            GameError::Internal(detail) => {
                tracing::error!(path, detail = %detail, "request failed with internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let validation = match &err {
            GameError::ValidationFailed(fields) => Some(fields.clone()),
            _ => None,
        };
        Self {
            status: status_for(&err),
            kind: err.kind(),
            message,
            path: path.to_string(),
            validation,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: String,
    error: &'static str,
    timestamp: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_errors: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            message: self.message,
            error: self.kind,
            timestamp: Utc::now().to_rfc3339(),
            path: self.path,
            validation_errors: self.validation,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Maps a service result into the envelope with the request path attached.
pub trait OrApiErr<T> {
    fn or_api(self, path: &str) -> Result<T, ApiError>;
}

impl<T> OrApiErr<T> for Result<T, GameError> {
    fn or_api(self, path: &str) -> Result<T, ApiError> {
        self.map_err(|err| ApiError::from_game(err, path))
    }
}
