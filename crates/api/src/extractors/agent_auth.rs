//! Device agent authentication extractor.
//!
//! Validates the long-lived agent bearer token and resolves it to a device
//! identity. Any signature, expiry, or token-type mismatch is rejected
//! before a handler runs, so auth failures never touch storage.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated device identity from an agent token.
#[derive(Debug, Clone)]
pub struct AgentAuth {
    /// Device ID from the token subject claim.
    pub device_id: Uuid,
    /// JWT ID (jti) for revocation bookkeeping.
    pub jti: String,
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized("Invalid Authorization header format".to_string())
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AgentAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = state
            .jwt
            .validate_agent_token(token)
            .map_err(|_| ApiError::Unauthorized("Invalid agent token".to_string()))?;

        let device_id = shared::jwt::extract_subject(&claims)
            .map_err(|_| ApiError::Unauthorized("Invalid agent token".to_string()))?;

        Ok(AgentAuth {
            device_id,
            jti: claims.jti,
        })
    }
}
