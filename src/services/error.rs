//! Error taxonomy for route handlers
//!
//! Every error returned to a caller is structured: a stable kind plus a human
//! message. Internal detail (SQL errors, storage client errors) is logged
//! server-side and never echoed back.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::storage::StorageError;

#[derive(Debug)]
pub enum ApiError {
    /// Missing or empty required field (400)
    Validation(String),
    /// Missing, invalid, or expired credential (401)
    Authentication(String),
    /// Valid actor, wrong owner (403) - distinct from NotFound
    Forbidden(String),
    /// Identifier does not resolve (404)
    NotFound(String),
    /// Duplicate registration from the same origin signal (403)
    RateLimited(String),
    /// Blob store unreachable or timed out (502) - retryable by the caller
    UpstreamStorage(String),
    /// Anything else; detail stays server-side (500)
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Authentication(_) => "authentication",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::RateLimited(_) => "rate_limited",
            ApiError::UpstreamStorage(_) => "upstream_storage",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::FORBIDDEN,
            ApiError::UpstreamStorage(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(m)
            | ApiError::Authentication(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::RateLimited(m)
            | ApiError::UpstreamStorage(m)
            | ApiError::Internal(m) => write!(f, "{}: {}", self.kind(), m),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            // Internal detail is logged where the error arose, not echoed
            ApiError::Internal(detail) => {
                eprintln!("internal error: {}", detail);
                "internal server error".to_string()
            }
            ApiError::Validation(m)
            | ApiError::Authentication(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::RateLimited(m)
            | ApiError::UpstreamStorage(m) => m.clone(),
        };

        let body = Json(json!({
            "error": self.kind(),
            "message": message,
        }));

        (self.status(), body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(format!("database error: {}", e))
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::UpstreamStorage(e.to_string())
    }
}

/// Extension trait for logging errors with context and converting to ApiError
pub trait LogErr<T> {
    /// Log error with context and return ApiError::Internal
    fn log_internal(self, context: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> LogErr<T> for Result<T, E> {
    fn log_internal(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| {
            eprintln!("{}: {}", context, e);
            ApiError::Internal(format!("{}: {}", context, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Authentication("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::RateLimited("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::UpstreamStorage("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_forbidden_and_rate_limited_are_distinct_kinds() {
        // Both map to 403 but callers must be able to tell them apart
        assert_ne!(
            ApiError::Forbidden("x".into()).kind(),
            ApiError::RateLimited("x".into()).kind()
        );
    }
}
