use crate::services::{
    cases::CaseError, intake::IntakeError, object_store::StoreError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ContainerNotFound(_) | StoreError::ObjectNotFound { .. } => {
                AppError::not_found(err.to_string())
            }
            StoreError::InvalidObjectKey | StoreError::InvalidContainerName { .. } => {
                AppError::bad_request(err.to_string())
            }
            StoreError::ContainerAlreadyExists(_) | StoreError::ObjectAlreadyExists { .. } => {
                AppError::new(StatusCode::CONFLICT, err.to_string())
            }
            other => {
                error!("storage failure: {}", other);
                AppError::internal(other.to_string())
            }
        }
    }
}

impl From<CaseError> for AppError {
    fn from(err: CaseError) -> Self {
        match err {
            CaseError::Validation(msg) => AppError::bad_request(msg),
            CaseError::NotFound(msg) => AppError::not_found(msg),
            CaseError::Conflict(msg) => AppError::new(StatusCode::CONFLICT, msg),
            CaseError::Forbidden(msg) => AppError::new(StatusCode::FORBIDDEN, msg),
            CaseError::Store(err) => err.into(),
            CaseError::Sqlx(err) => {
                error!("database failure: {}", err);
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Validation(msg) => AppError::bad_request(msg),
            IntakeError::NotFound(msg) => AppError::not_found(msg),
            other => {
                error!("upload batch failed: {}", other);
                AppError::internal(format!("An error occurred during file upload: {other}"))
            }
        }
    }
}
