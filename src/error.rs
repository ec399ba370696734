use crate::db::models::api::{ApiResponse, error_codes};
use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        field: Option<String>,
        code: Option<String>,
    },

    #[error("Precondition failed: {message}")]
    Precondition { message: String, code: &'static str },

    #[error("Assessment incomplete: {answered} of {total} questions answered")]
    Incomplete { answered: i64, total: i64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, response) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::internal_error("Database error"),
                )
            }
            AppError::Pool(ref e) => {
                tracing::error!("Connection pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::internal_error("Connection error"),
                )
            }
            AppError::Auth { ref message } => (
                StatusCode::UNAUTHORIZED,
                ApiResponse::<()>::unauthorized(message),
            ),
            AppError::Forbidden { ref message } => (
                StatusCode::FORBIDDEN,
                ApiResponse::<()>::forbidden(message),
            ),
            AppError::Validation { ref message } => (
                StatusCode::BAD_REQUEST,
                ApiResponse::<()>::bad_request(message),
            ),
            AppError::NotFound { ref resource } => (
                StatusCode::NOT_FOUND,
                ApiResponse::<()>::not_found(&format!("{} not found", resource)),
            ),
            AppError::Conflict {
                ref message,
                ref field,
                ref code,
            } => (
                StatusCode::CONFLICT,
                ApiResponse::<()>::conflict(message, field.clone(), code.as_deref().unwrap_or("")),
            ),
            AppError::Precondition { ref message, code } => (
                StatusCode::BAD_REQUEST,
                ApiResponse::<()>::precondition_failed(message, code),
            ),
            AppError::Incomplete { answered, total } => {
                // The client needs the current progress to resolve this one
                let message = format!(
                    "All questions must be answered before completing: {} remaining",
                    (total - answered).max(0)
                );
                let response = ApiResponse::error_with_data(
                    400,
                    error_codes::ASSESSMENT_INCOMPLETE,
                    &message,
                    serde_json::json!({ "progress": { "answered": answered, "total": total } }),
                );
                return (StatusCode::BAD_REQUEST, Json(response)).into_response();
            }
            AppError::Config(ref e) => {
                tracing::error!("Configuration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::internal_error("Configuration error"),
                )
            }
            AppError::Jwt(ref e) => {
                tracing::debug!("JWT error: {}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    ApiResponse::<()>::unauthorized("Invalid token"),
                )
            }
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::internal_error("Internal server error"),
                )
            }
        };

        (status, Json(response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

// Convenience constructors
impl AppError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict_with_code(
        message: impl Into<String>,
        field: Option<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            message: message.into(),
            field,
            code: Some(code.into()),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
            code: error_codes::PRECONDITION_FAILED,
        }
    }

    pub fn precondition_with_code(message: impl Into<String>, code: &'static str) -> Self {
        Self::Precondition {
            message: message.into(),
            code,
        }
    }
}
