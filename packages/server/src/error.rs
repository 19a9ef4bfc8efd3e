use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `NOT_FOUND`, `USERNAME_TAKEN`,
    /// `RANGE_NOT_SATISFIABLE`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Malformed video filename 'bad.name'")]
    pub message: String,
}

/// Error body for rejected workout-log payloads (HTTP 406).
#[derive(Serialize, utoipa::ToSchema)]
pub struct FieldErrorBody {
    /// Path of the offending field.
    #[schema(example = "exercises.0.sets.1.id")]
    pub field: String,
    /// What is wrong with it.
    #[schema(example = "duplicate set id 's1'")]
    pub error: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// A single payload field failed validation.
    FieldValidation {
        field: String,
        error: String,
    },
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    NotFound(String),
    /// Not found, answered with an empty body.
    NotFoundEmpty,
    UsernameTaken,
    RangeNotSatisfiable {
        total: u64,
    },
    Internal(String),
}

impl AppError {
    pub fn field(field: impl Into<String>, error: impl Into<String>) -> Self {
        AppError::FieldValidation {
            field: field.into(),
            error: error.into(),
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid username or password".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "USERNAME_TAKEN",
                    message: "Username is already taken".into(),
                },
            ),
            AppError::RangeNotSatisfiable { total } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                ErrorBody {
                    code: "RANGE_NOT_SATISFIABLE",
                    message: format!("Requested range not satisfiable for {total} bytes"),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
            AppError::FieldValidation { field, error } => (
                StatusCode::NOT_ACCEPTABLE,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: format!("{field}: {error}"),
                },
            ),
            AppError::NotFoundEmpty => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: "Not found".into(),
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFoundEmpty => StatusCode::NOT_FOUND.into_response(),
            AppError::FieldValidation { field, error } => (
                StatusCode::NOT_ACCEPTABLE,
                Json(FieldErrorBody { field, error }),
            )
                .into_response(),
            AppError::RangeNotSatisfiable { total } => {
                let content_range = format!("bytes */{total}");
                let (status, body) = self.status_and_body();
                (status, [(header::CONTENT_RANGE, content_range)], Json(body)).into_response()
            }
            other => {
                let (status, body) = other.status_and_body();
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                tracing::warn!("Blob missing for recorded video: {key}");
                AppError::NotFoundEmpty
            }
            StorageError::InvalidRange { size, .. } => {
                AppError::RangeNotSatisfiable { total: size }
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
