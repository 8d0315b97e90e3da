// Shared error taxonomy for the game engines.
//
// Every engine raises these typed kinds; the HTTP boundary owns the mapping
// to status codes and the response envelope. Infra code folds storage and
// transport failures into `Conflict`, `ServiceUnavailable` or `Internal`.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Field-level detail attached to `ValidationFailed`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum GameError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("choice already submitted for this adventure")]
    AlreadySubmitted,

    #[error("goal is already completed")]
    AlreadyCompleted,

    #[error("{0}")]
    InvalidAmount(String),

    #[error("choice index {index} is out of range (0..{choices})")]
    InvalidChoice { index: i32, choices: usize },

    #[error("character is not eligible as a starter")]
    InvalidStarter,

    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient quantity: need {required}, have {available}")]
    InsufficientQuantity { required: i32, available: i32 },

    #[error("no mission is active today")]
    NoActiveMission,

    #[error("validation failed")]
    ValidationFailed(Vec<FieldError>),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl GameError {
    /// Short kind tag used in the HTTP error envelope and in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::Unauthorized => "Unauthorized",
            GameError::Forbidden(_) => "Forbidden",
            GameError::NotFound(_) => "NotFound",
            GameError::Conflict(_) => "Conflict",
            GameError::AlreadySubmitted => "AlreadySubmitted",
            GameError::AlreadyCompleted => "AlreadyCompleted",
            GameError::InvalidAmount(_) => "InvalidAmount",
            GameError::InvalidChoice { .. } => "InvalidChoice",
            GameError::InvalidStarter => "InvalidStarter",
            GameError::InsufficientFunds { .. } => "InsufficientFunds",
            GameError::InsufficientQuantity { .. } => "InsufficientQuantity",
            GameError::NoActiveMission => "NoActiveMission",
            GameError::ValidationFailed(_) => "ValidationFailed",
            GameError::ServiceUnavailable(_) => "ServiceUnavailable",
            GameError::Internal(_) => "Internal",
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        GameError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(GameError::Unauthorized.kind(), "Unauthorized");
        assert_eq!(
            GameError::ValidationFailed(vec![FieldError::new("age", "out of range")]).kind(),
            "ValidationFailed"
        );
        assert_eq!(GameError::NoActiveMission.kind(), "NoActiveMission");
    }
}
