use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::orchestrator::NotifyError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The delivery log could not be read. Callers must treat message
    /// uniqueness as unknown, never as "not sent".
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Invalid JSON body: {0}")]
    JsonRejection(#[from] JsonRejection),

    #[error("Invalid query: {0}")]
    QueryRejection(#[from] QueryRejection),

    #[error("Invalid path: {0}")]
    PathRejection(#[from] PathRejection),

    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] NotifyError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Re-tag any store failure on a read path as `StoreUnavailable`.
    pub fn into_store_unavailable(self) -> Self {
        match self {
            AppError::StoreUnavailable(_) => self,
            AppError::Persistence(e) => AppError::StoreUnavailable(e.to_string()),
            AppError::Pool(e) => AppError::StoreUnavailable(e.to_string()),
            other => other,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone())),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
            }
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Delivery log unavailable: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check message history", None)
            }
            AppError::Persistence(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::JsonRejection(e) => {
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.body_text()))
            }
            AppError::QueryRejection(e) => {
                (StatusCode::BAD_REQUEST, "Invalid query", Some(e.body_text()))
            }
            AppError::PathRejection(e) => {
                (StatusCode::BAD_REQUEST, "Invalid path", Some(e.body_text()))
            }
            AppError::Orchestrator(e) => {
                tracing::error!("Failed to trigger orchestrator webhook: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to trigger webhook",
                    Some(e.to_string()),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(msg.clone()))
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
