//! Operator authentication extractor.
//!
//! The control plane is authenticated separately from agents: operators
//! present short-lived access tokens signed with the user key. Issuing
//! those tokens (login, roles) lives outside this service; this extractor
//! is the seam that turns a bearer token into an operator identity used
//! for `created_by`/`acknowledged_by` attribution.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated operator identity from a user access token.
#[derive(Debug, Clone)]
pub struct OperatorAuth {
    /// Operator user ID from the token subject claim.
    pub user_id: Uuid,
    /// JWT ID (jti) for session tracking.
    pub jti: String,
}

#[async_trait]
impl FromRequestParts<AppState> for OperatorAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let claims = state
            .jwt
            .validate_access_token(token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        let user_id = shared::jwt::extract_subject(&claims)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(OperatorAuth {
            user_id,
            jti: claims.jti,
        })
    }
}
