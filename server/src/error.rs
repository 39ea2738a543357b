//! Authorization Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scopegate_common::{DenialResponse, ScopeType};
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the guard, the gateway and the principal boundary.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Requested capability not granted, or scope id mismatch.
    #[error("Permission denied: {}", describe_denial(.permission, .scope_type, .scope_id))]
    PermissionDenied {
        permission: String,
        scope_type: ScopeType,
        scope_id: Option<String>,
    },

    /// Malformed or unresolvable principal payload.
    #[error("Invalid scope context: {0}")]
    InvalidScopeContext(String),

    /// Unsupported scope tag.
    #[error("Unsupported scope type: {0}")]
    InvalidScopeType(String),

    /// Gateway used without a resolvable context, or bypass without an audit marker.
    #[error("Scope violation: {0}")]
    ScopeViolation(String),

    /// Bearer credential present but unusable.
    #[error("Invalid or expired token")]
    Unauthenticated,

    /// Database error.
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl AuthzError {
    /// Denial for `permission` at `scope_type`, optionally naming the scope id.
    pub fn denied(permission: impl Into<String>, scope_type: ScopeType, scope_id: Option<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
            scope_type,
            scope_id,
        }
    }
}

impl From<scopegate_common::Error> for AuthzError {
    fn from(err: scopegate_common::Error) -> Self {
        match err {
            scopegate_common::Error::InvalidScopeType(tag) => Self::InvalidScopeType(tag),
        }
    }
}

fn describe_denial(permission: &str, scope_type: &ScopeType, scope_id: &Option<String>) -> String {
    scopegate_common::describe_requirement(permission, *scope_type, scope_id.as_deref())
}

/// Error response body for non-denial failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::PermissionDenied {
                permission,
                scope_type,
                scope_id,
            } => {
                let body = DenialResponse::new(permission, *scope_type, scope_id.as_deref());
                return (StatusCode::FORBIDDEN, Json(body)).into_response();
            }
            Self::InvalidScopeContext(_) => (StatusCode::BAD_REQUEST, "INVALID_SCOPE_CONTEXT"),
            Self::InvalidScopeType(_) => (StatusCode::BAD_REQUEST, "INVALID_SCOPE_TYPE"),
            Self::ScopeViolation(_) => (StatusCode::FORBIDDEN, "SCOPE_VIOLATION"),
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            Self::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            code: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;
