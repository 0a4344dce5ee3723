//! Platform Error Types

use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::api::common::ApiError;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Duplicate entity: {entity_type} with {field}={value}")]
    Duplicate { entity_type: String, field: String, value: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Validation failed for {} field(s)", .0.len())]
    InvalidFields(Vec<FieldError>),

    #[error("Authorization error: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(entity_type: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// True when a database error is a unique-constraint violation
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidFields(_) | Self::Duplicate { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. }
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Database(_)
            | Self::Json(_)
            | Self::Storage(_)
            | Self::Configuration { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } | Self::InvalidFields(_) => "VALIDATION_ERROR",
            Self::Duplicate { .. } => "CONFLICT",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken { .. } => "INVALID_TOKEN",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            _ => "INTERNAL_ERROR",
        }
    }

    fn to_api_error(&self) -> ApiError {
        let (message, details) = match self {
            Self::Duplicate { entity_type, field, .. } => (
                format!("{} with this {} already exists", entity_type, field),
                Some(serde_json::json!({ "field": field })),
            ),
            Self::InvalidFields(fields) => (
                "Request validation failed".to_string(),
                Some(serde_json::json!({ "fields": fields })),
            ),
            Self::Validation { message } => (message.clone(), None),
            Self::Unauthorized { message } | Self::Forbidden { message } => (message.clone(), None),
            Self::InvalidToken { message } => (message.clone(), None),
            Self::NotFound { .. } | Self::InvalidCredentials | Self::TokenExpired => (self.to_string(), None),
            _ => ("An internal error occurred".to_string(), None),
        };

        ApiError {
            error: self.error_code().to_string(),
            message,
            details,
        }
    }
}

impl From<JsonRejection> for PlatformError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for PlatformError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for PlatformError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed with internal error");
        }
        (status, Json(self.to_api_error())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PlatformError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PlatformError::duplicate("Tenant", "domain", "acme.com").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(PlatformError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(PlatformError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(PlatformError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(PlatformError::not_found("Asset", "1").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(PlatformError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_details_hidden() {
        let api = PlatformError::internal("connection refused at 10.0.0.3").to_api_error();
        assert_eq!(api.error, "INTERNAL_ERROR");
        assert!(!api.message.contains("10.0.0.3"));
    }

    #[test]
    fn test_duplicate_body() {
        let api = PlatformError::duplicate("Tenant", "domain", "acme.com").to_api_error();
        assert_eq!(api.error, "CONFLICT");
        assert_eq!(api.message, "Tenant with this domain already exists");
        assert_eq!(api.details.unwrap()["field"], "domain");
    }

    #[test]
    fn test_field_errors_in_details() {
        let api = PlatformError::InvalidFields(vec![FieldError {
            field: "email".to_string(),
            message: "must be a valid email address".to_string(),
        }])
        .to_api_error();
        assert_eq!(api.error, "VALIDATION_ERROR");
        assert_eq!(api.details.unwrap()["fields"][0]["field"], "email");
    }
}
