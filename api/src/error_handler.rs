use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chat_store::ChatError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::core::app_state::ConfigError;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error(transparent)]
    Config(#[from] ConfigError),

    // --- IO / network / server ---
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Chat(e) => match e {
                ChatError::NotFound(_) => StatusCode::NOT_FOUND,
                ChatError::InvalidId(_) | ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
                ChatError::Mongo(_) | ChatError::Conversion(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },

            // startup-only or unexpected
            AppError::Config(_)
            | AppError::Bind(_)
            | AppError::Server(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Chat(ChatError::NotFound(_)) => "CHAT_NOT_FOUND",
            AppError::Chat(ChatError::InvalidId(_)) => "INVALID_CHAT_ID",
            AppError::Chat(ChatError::EmptyMessage) => "EMPTY_MESSAGE",
            AppError::Chat(_) => "CHAT_STORE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: String,
    code: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            detail: self.to_string(),
            code: self.error_code(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;
