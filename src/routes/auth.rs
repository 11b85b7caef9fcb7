//! Bearer credential extraction
//!
//! Every mutating endpoint other than registration takes an `AuthUser`
//! argument; read-only catalog routes do not.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::AppState;
use crate::services::error::ApiError;
use crate::services::session;

/// Extractor that verifies the Authorization bearer token and yields the
/// account id embedded in it. The signature check happens before the id is
/// trusted, so a forged token never reaches a handler.
pub struct AuthUser(pub i64);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Authentication("missing bearer credential".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Authentication("malformed authorization header".to_string())
        })?;

        let account_id = session::verify_token(token, &state.jwt_secret)
            .map_err(|e| ApiError::Authentication(e.to_string()))?;

        Ok(AuthUser(account_id))
    }
}
