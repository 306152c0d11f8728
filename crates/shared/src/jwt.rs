//! JWT token utilities for user and agent authentication.
//!
//! Two independent HMAC-SHA256 signing keys are used: one for interactive
//! user sessions (short-lived access/refresh tokens) and one for device
//! agents (long-lived tokens, on the order of a year). A token signed with
//! one key never validates against the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(String),

    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

/// JWT token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID for interactive tokens, device ID for agent tokens)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID (unique token identifier for revocation bookkeeping)
    pub jti: String,
    /// Token type (access, refresh, or agent)
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Type of JWT token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
    Agent,
}

/// Default leeway in seconds for clock skew tolerance
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Configuration for JWT token generation and validation.
#[derive(Clone)]
pub struct JwtConfig {
    /// Signing key for interactive user tokens
    user_encoding_key: EncodingKey,
    user_decoding_key: DecodingKey,
    /// Independent signing key for device agent tokens
    agent_encoding_key: EncodingKey,
    agent_decoding_key: DecodingKey,
    /// Access token expiration in seconds (default: 1800 = 30 minutes)
    pub access_token_expiry_secs: i64,
    /// Refresh token expiration in seconds (default: 604800 = 7 days)
    pub refresh_token_expiry_secs: i64,
    /// Agent token expiration in days (default: 365)
    pub agent_token_expiry_days: i64,
    /// Leeway in seconds for clock skew tolerance (default: 30)
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("refresh_token_expiry_secs", &self.refresh_token_expiry_secs)
            .field("agent_token_expiry_days", &self.agent_token_expiry_days)
            .field("leeway_secs", &self.leeway_secs)
            .field("user_encoding_key", &"[REDACTED]")
            .field("agent_encoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtConfig {
    /// Creates a new JwtConfig from the two HMAC secrets.
    pub fn new(
        user_secret: &str,
        agent_secret: &str,
        access_token_expiry_secs: i64,
        refresh_token_expiry_secs: i64,
        agent_token_expiry_days: i64,
        leeway_secs: u64,
    ) -> Self {
        Self {
            user_encoding_key: EncodingKey::from_secret(user_secret.as_bytes()),
            user_decoding_key: DecodingKey::from_secret(user_secret.as_bytes()),
            agent_encoding_key: EncodingKey::from_secret(agent_secret.as_bytes()),
            agent_decoding_key: DecodingKey::from_secret(agent_secret.as_bytes()),
            access_token_expiry_secs,
            refresh_token_expiry_secs,
            agent_token_expiry_days,
            leeway_secs,
        }
    }

    /// Generates an access token for the given user ID.
    /// Returns the encoded token and its jti.
    pub fn generate_access_token(&self, user_id: Uuid) -> Result<(String, String), JwtError> {
        self.generate_token(
            user_id,
            TokenType::Access,
            Duration::seconds(self.access_token_expiry_secs),
            &self.user_encoding_key,
        )
    }

    /// Generates a refresh token for the given user ID.
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<(String, String), JwtError> {
        self.generate_token(
            user_id,
            TokenType::Refresh,
            Duration::seconds(self.refresh_token_expiry_secs),
            &self.user_encoding_key,
        )
    }

    /// Generates a long-lived agent token for the given device ID.
    pub fn generate_agent_token(&self, device_id: Uuid) -> Result<(String, String), JwtError> {
        self.generate_token(
            device_id,
            TokenType::Agent,
            Duration::days(self.agent_token_expiry_days),
            &self.agent_encoding_key,
        )
    }

    fn generate_token(
        &self,
        subject: Uuid,
        token_type: TokenType,
        expiry: Duration,
        key: &EncodingKey,
    ) -> Result<(String, String), JwtError> {
        let now = Utc::now();
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + expiry).timestamp(),
            iat: now.timestamp(),
            jti: jti.clone(),
            token_type,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok((token, jti))
    }

    fn validate_token(&self, token: &str, key: &DecodingKey) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        let token_data = decode::<Claims>(token, key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken
            | jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidToken,
            _ => JwtError::DecodingError(e.to_string()),
        })?;

        Ok(token_data.claims)
    }

    /// Validates an access token against the user signing key.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token, &self.user_decoding_key)?;
        if claims.token_type != TokenType::Access {
            return Err(JwtError::InvalidToken);
        }
        Ok(claims)
    }

    /// Validates a refresh token against the user signing key.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token, &self.user_decoding_key)?;
        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::InvalidToken);
        }
        Ok(claims)
    }

    /// Validates an agent token against the agent signing key.
    ///
    /// A user token presented here fails signature validation because the
    /// agent key is independent; an agent token with a mismatched type
    /// claim fails the type check.
    pub fn validate_agent_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token, &self.agent_decoding_key)?;
        if claims.token_type != TokenType::Agent {
            return Err(JwtError::InvalidToken);
        }
        Ok(claims)
    }
}

/// Extracts the subject UUID from validated claims.
pub fn extract_subject(claims: &Claims) -> Result<Uuid, JwtError> {
    Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)
}
