// src/errors.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::Error as DieselError;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

/// Application-wide error type. Every failure crossing the handler boundary
/// is mapped to one of these and rendered as the standard error envelope.
///
/// All variants carry `String` payloads so the error stays `Clone` (mock
/// collaborators in tests script `Result<_, AppError>` values).
#[derive(Error, Debug, Clone)]
pub enum AppError {
    // --- Request/input errors ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid request payload")]
    Validation(Vec<String>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // --- External service errors ---
    #[error("AI upstream error: {0}")]
    AiUpstream(String),

    // --- Database errors ---
    #[error("Database query error: {0}")]
    DatabaseQuery(String),

    #[error("Database pool error: {0}")]
    DbPool(String),

    #[error("Database interaction error: {0}")]
    DbInteract(String),

    // --- General/internal errors ---
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code, per the error taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) | AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::AiUpstream(_) => "AI_UPSTREAM_ERROR",
            AppError::DatabaseQuery(_)
            | AppError::DbPool(_)
            | AppError::DbInteract(_)
            | AppError::PasswordHash(_)
            | AppError::Config(_)
            | AppError::Internal(_) => "SERVER_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AiUpstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::Validation(errors) => Some(json!(errors)),
            _ => None,
        }
    }
}

// Raw internal detail is only exposed outside production.
fn expose_internal_detail() -> bool {
    std::env::var("APP_ENV")
        .map(|env| env != "production")
        .unwrap_or(true)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let message = if status.is_server_error() {
            error!(error = %self, code, "Request failed with server error");
            if expose_internal_detail() {
                self.to_string()
            } else {
                "Internal server error".to_string()
            }
        } else {
            match &self {
                AppError::Validation(_) => "Invalid request payload".to_string(),
                other => {
                    // Strip the variant prefix; the code already identifies it.
                    match other {
                        AppError::InvalidInput(msg)
                        | AppError::Unauthorized(msg)
                        | AppError::NotFound(msg)
                        | AppError::Conflict(msg)
                        | AppError::AiUpstream(msg) => msg.clone(),
                        _ => other.to_string(),
                    }
                }
            }
        };

        let mut error_body = json!({
            "code": code,
            "message": message,
        });
        if let Some(details) = self.details() {
            error_body["details"] = details;
        }

        (status, Json(json!({ "error": error_body }))).into_response()
    }
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound("Record not found".to_string()),
            _ => AppError::DatabaseQuery(err.to_string()),
        }
    }
}

impl From<deadpool_diesel::PoolError> for AppError {
    fn from(err: deadpool_diesel::PoolError) -> Self {
        AppError::DbPool(err.to_string())
    }
}

impl From<deadpool_diesel::InteractError> for AppError {
    fn from(err: deadpool_diesel::InteractError) -> Self {
        AppError::DbInteract(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::PasswordHash(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:?}", err))
    }
}
