//! Error types for the lending library

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Error codes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Required field absent
    Missing,
    /// Field present with the wrong primitive type
    BadType,
    /// Field of the right type violating a constraint, or a business rule violation
    BadReq,
    NotFound,
    Db,
    Internal,
}

impl ErrorCode {
    /// Validation priority: lower ranks are reported first
    pub fn rank(self) -> u8 {
        match self {
            ErrorCode::Missing => 0,
            ErrorCode::BadType => 1,
            ErrorCode::BadReq => 2,
            ErrorCode::NotFound => 3,
            ErrorCode::Db => 4,
            ErrorCode::Internal => 5,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Missing => "MISSING",
            ErrorCode::BadType => "BAD_TYPE",
            ErrorCode::BadReq => "BAD_REQ",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Db => "DB",
            ErrorCode::Internal => "INTERNAL",
        };
        f.write_str(name)
    }
}

/// A single error, optionally tied to the request field (widget) responsible for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(code: ErrorCode, widget: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            widget: Some(widget.into()),
            message: message.into(),
        }
    }
}

/// Non-empty list of validation errors, ordered by priority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new(mut errors: Vec<FieldError>) -> Self {
        // stable: keeps schema order within a code
        errors.sort_by_key(|e| e.code.rank());
        Self(errors)
    }

    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }

    /// Code of the highest-priority error
    pub fn code(&self) -> ErrorCode {
        self.0.first().map(|e| e.code).unwrap_or(ErrorCode::BadReq)
    }

    /// Find the error reported for a field
    pub fn field(&self, widget: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.widget.as_deref() == Some(widget))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .0
            .iter()
            .map(|e| match &e.widget {
                Some(w) => format!("{} {}: {}", e.code, w, e.message),
                None => format!("{}: {}", e.code, e.message),
            })
            .collect();
        f.write_str(&messages.join("; "))
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Invalid(FieldErrors),

    #[error("Bad request: {message}")]
    BadRequest { widget: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Business-rule violation attributed to a request field
    pub fn bad_request(widget: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::BadRequest {
            widget: widget.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Invalid(errors) => errors.code(),
            AppError::BadRequest { .. } | AppError::Conflict(_) => ErrorCode::BadReq,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Database(_) | AppError::Migration(_) => ErrorCode::Db,
            AppError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Field tag of the (first) error, if any
    pub fn widget(&self) -> Option<&str> {
        match self {
            AppError::Invalid(errors) => errors.as_slice().first().and_then(|e| e.widget.as_deref()),
            AppError::BadRequest { widget, .. } => Some(widget),
            _ => None,
        }
    }

    /// Structured error list as reported to callers
    pub fn errors(&self) -> Vec<FieldError> {
        match self {
            AppError::Invalid(errors) => errors.as_slice().to_vec(),
            AppError::BadRequest { widget, message } => {
                vec![FieldError::new(ErrorCode::BadReq, widget.clone(), message.clone())]
            }
            AppError::NotFound(msg) | AppError::Conflict(msg) => vec![FieldError {
                code: self.code(),
                widget: None,
                message: msg.clone(),
            }],
            AppError::Database(_) | AppError::Migration(_) => vec![FieldError {
                code: ErrorCode::Db,
                widget: None,
                message: "Database error".to_string(),
            }],
            AppError::Internal(_) => vec![FieldError {
                code: ErrorCode::Internal,
                widget: None,
                message: "Internal server error".to_string(),
            }],
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Invalid(errors)
    }
}

/// Error response body
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.code() {
            ErrorCode::Missing | ErrorCode::BadType | ErrorCode::BadReq => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Db => {
                tracing::error!("Database error: {:?}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::Internal => {
                tracing::error!("Internal error: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            errors: self.errors(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_sorted_by_priority() {
        let errors = FieldErrors::new(vec![
            FieldError::new(ErrorCode::BadReq, "isbn", "bad isbn"),
            FieldError::new(ErrorCode::Missing, "title", "missing"),
            FieldError::new(ErrorCode::BadType, "pages", "not a number"),
        ]);
        let codes: Vec<ErrorCode> = errors.as_slice().iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![ErrorCode::Missing, ErrorCode::BadType, ErrorCode::BadReq]);
        assert_eq!(errors.code(), ErrorCode::Missing);
    }

    #[test]
    fn test_database_error_is_opaque() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.code(), ErrorCode::Db);
        let errors = err.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Database error");
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::BadType).unwrap();
        assert_eq!(json, "\"BAD_TYPE\"");
    }
}
