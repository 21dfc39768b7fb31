use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Contract not found")]
    ContractNotFound,

    #[error("No action in progress for this contract")]
    NoActiveInteraction,

    #[error("Another action is in progress for this contract")]
    InteractionMismatch,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Message safe to show next to the failed action
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(err) => err.to_string(),
            AppError::Database(_) | AppError::Internal(_) | AppError::Json(_) => {
                "Database error".to_string()
            }
            _ => self.to_string(),
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Internal(_))
    }
}

// Convert AppError to an HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, Some(err.code())),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            AppError::ContractNotFound => (StatusCode::NOT_FOUND, None),
            AppError::NoActiveInteraction | AppError::InteractionMismatch => {
                (StatusCode::CONFLICT, None)
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            AppError::Json(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        if status.is_server_error() {
            tracing::error!(?self);
        }
        let body = Json(ErrorResponse {
            error: self.user_message(),
            code: code.map(str::to_string),
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

pub type Result<T> = std::result::Result<T, AppError>;
