use serde::Serialize;
use serde_json::json;
use std::fmt::Display;

use anyhow::Error as anyhowError;
use axum::{http::StatusCode, response::IntoResponse};

use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    // 400 bad request
    BadRequest(anyhowError),
    // 401 unauthorized
    Unauthorized(anyhowError),
    // 403 forbidden
    Forbidden(anyhowError),
    // 404 not found
    NotFound(anyhowError),
    // 409 conflict
    Conflict(anyhowError),
    // 500 internal server error
    InternalServerError(anyhowError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(e) => write!(f, "BadRequest: {}", e),
            AppError::Unauthorized(e) => write!(f, "Unauthorized: {}", e),
            AppError::Forbidden(e) => write!(f, "Forbidden: {}", e),
            AppError::NotFound(e) => write!(f, "NotFound: {}", e),
            AppError::Conflict(e) => write!(f, "Conflict: {}", e),
            AppError::InternalServerError(e) => write!(f, "InternalServerError: {}", e),
        }
    }
}

impl From<anyhowError> for AppError {
    fn from(e: anyhowError) -> Self {
        AppError::InternalServerError(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        tracing::debug!(kind = ?e.kind(), error = %e, "operation rejected");
        match e {
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Permission(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            ServiceError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::Internal(err) => AppError::InternalServerError(err),
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::Validation,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Permission,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InternalServerError(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match &self {
            Self::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string()),
            Self::Forbidden(err) => (StatusCode::FORBIDDEN, err.to_string()),
            Self::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Conflict(err) => (StatusCode::CONFLICT, err.to_string()),
            Self::InternalServerError(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        #[cfg(debug_assertions)]
        let error_response = json!({
            "error": {
                "kind": self.kind(),
                "message": error_message,
                "type": format!("{:?}", self),
            }
        });

        // Client errors carry a message the caller can render; server errors don't leak detail.
        #[cfg(not(debug_assertions))]
        let error_response = json!({
            "error": {
                "kind": self.kind(),
                "message": if status.is_server_error() {
                    status.canonical_reason().unwrap_or("An error occurred").to_string()
                } else {
                    error_message
                },
            }
        });
        (status, axum::Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error classification, sent as `error.kind` in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,
    #[serde(rename = "PERMISSION_ERROR")]
    Permission,
    #[serde(rename = "NOT_FOUND_ERROR")]
    NotFound,
    #[serde(rename = "CONFLICT_ERROR")]
    Conflict,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

/// Outcome of a rejected group or friendship operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Permission(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhowError),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Permission(_) => ErrorKind::Permission,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::StaleVersion => {
                tracing::warn!("write rejected: group changed since it was read");
                Self::conflict("The group was modified by another request, please retry")
            }
            other => {
                tracing::error!(error = %other, "store operation failed");
                Self::Internal(anyhow::Error::new(other))
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
