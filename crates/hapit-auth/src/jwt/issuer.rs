//! Token creation with configurable signing and TTL.

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use hapit_core::config::auth::AuthConfig;
use hapit_core::error::AppError;
use hapit_entity::User;

use super::TOKEN_ISSUER;
use super::claims::{Claims, TokenKind};

/// Creates signed access and refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Access token TTL in seconds.
    access_ttl_seconds: i64,
    /// Refresh token TTL in seconds.
    refresh_ttl_seconds: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

/// Result of a successful token pair generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl TokenIssuer {
    /// Creates a new issuer from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl_seconds: config.access_ttl_hours as i64 * 3600,
            refresh_ttl_seconds: config.refresh_ttl_days as i64 * 86400,
        }
    }

    /// Issues a signed access token for the given user.
    pub fn issue_access_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            name: Some(user.name.clone()),
            iss: TOKEN_ISSUER.to_string(),
            iat: now,
            exp: now + self.access_ttl_seconds,
            kind: TokenKind::Access,
        };
        self.sign(&claims)
    }

    /// Issues a signed refresh token for the given user.
    ///
    /// Refresh claims carry no display name; they exist only to redeem new
    /// token pairs.
    pub fn issue_refresh_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            name: None,
            iss: TOKEN_ISSUER.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_seconds,
            kind: TokenKind::Refresh,
        };
        self.sign(&claims)
    }

    /// Issues an access + refresh pair.
    ///
    /// Each token computes its own issued-at timestamp; two calls within
    /// the same second may produce byte-identical tokens.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token: self.issue_refresh_token(user)?,
            expires_in: self.access_ttl_seconds as u64,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
    }
}
