//! Auth orchestrator — login, refresh, logout, and introspection flows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hapit_core::error::{AppError, ErrorKind};
use hapit_entity::PublicUser;

use crate::jwt::{self, Claims, TokenIssuer, TokenKind, TokenPair, TokenVerifier};
use crate::registry::{RegistryStats, SessionRegistry};
use crate::store::UserStore;

/// Result of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    /// The authenticated user, sanitized.
    pub user: PublicUser,
    /// Generated token pair.
    pub tokens: TokenPair,
}

/// Session summary for the current-user endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Active refresh sessions for the user.
    pub active_sessions: usize,
    /// When the presented access token was issued.
    pub current_token_issued: DateTime<Utc>,
}

/// Read-only decode diagnostics for the debug endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDiagnostics {
    /// Whether the token passed verification.
    pub valid: bool,
    /// Whether the token is on the blacklist.
    pub blacklisted: bool,
    /// Decoded claims, when verification succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
    /// Raw token length in bytes.
    pub token_length: usize,
}

/// Drives the auth flows against the codec, the registry, and the
/// external user store.
///
/// Constructed once at startup; every flow is terminal for its request —
/// nothing here retries.
#[derive(Clone)]
pub struct AuthManager {
    /// Token issuance.
    issuer: Arc<TokenIssuer>,
    /// Token verification.
    verifier: Arc<TokenVerifier>,
    /// Blacklist and refresh session state.
    registry: Arc<SessionRegistry>,
    /// User lookup and credential verification.
    users: Arc<dyn UserStore>,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager").finish()
    }
}

impl AuthManager {
    /// Creates a new manager with all required dependencies.
    pub fn new(
        issuer: Arc<TokenIssuer>,
        verifier: Arc<TokenVerifier>,
        registry: Arc<SessionRegistry>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            issuer,
            verifier,
            registry,
            users,
        }
    }

    /// Performs the login flow:
    ///
    /// 1. Delegate credential verification to the user store
    /// 2. Issue a token pair
    /// 3. Register the refresh token in the session registry
    ///
    /// Unknown users and wrong passwords both surface as the same
    /// `InvalidCredentials` outcome.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AppError> {
        let user = self
            .users
            .verify_credentials(username, password)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        let tokens = self.issuer.issue_pair(&user)?;

        if !self.registry.store_refresh_session(&tokens.refresh_token, user.id) {
            // A token we just issued must be storable.
            return Err(AppError::internal("Failed to register refresh session"));
        }

        info!(user_id = %user.id, username = %user.username, "Login successful");

        Ok(LoginResult {
            user: user.sanitized(),
            tokens,
        })
    }

    /// Gate in front of protected operations.
    ///
    /// Extracts the bearer token, verifies it, checks the blacklist, and
    /// requires kind=access. Every failure surfaces as `Unauthenticated`.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Claims, AppError> {
        let token = jwt::extract_bearer(authorization)
            .ok_or_else(|| AppError::unauthenticated("Authentication required"))?;

        let claims = self
            .verifier
            .verify(token)
            .map_err(|_| AppError::unauthenticated("Invalid or expired token"))?;

        if self.registry.is_blacklisted(token) {
            return Err(AppError::unauthenticated("Token has been revoked"));
        }
        if claims.kind != TokenKind::Access {
            return Err(AppError::unauthenticated("Access token required"));
        }

        Ok(claims)
    }

    /// Redeems a refresh token for a brand-new pair, rotating the session.
    ///
    /// The registry retires the old token and registers the new one under
    /// one lock acquisition. A session whose user record has been deleted
    /// in the meantime fails with `UserNotFound`; a session revoked by a
    /// concurrent flow between redeem and rotation surfaces as the same
    /// opaque invalid-token outcome as any other stale refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let user_id = self
            .registry
            .redeem_refresh_session(refresh_token)
            .ok_or_else(|| {
                AppError::new(ErrorKind::InvalidToken, "Invalid or expired refresh token")
            })?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::user_not_found("User not found"))?;

        let tokens = self
            .registry
            .rotate(refresh_token, &user)
            .map_err(|e| match e.kind {
                ErrorKind::SessionNotFound => {
                    AppError::new(ErrorKind::InvalidToken, "Invalid or expired refresh token")
                }
                _ => e,
            })?;

        info!(user_id = %user.id, "Token refreshed");

        Ok(tokens)
    }

    /// Performs logout: blacklists the access token and optionally revokes
    /// a refresh token supplied in the same request.
    ///
    /// Idempotent — blacklisting an already-revoked or invalid token is
    /// not an error.
    pub fn logout(&self, access_token: &str, refresh_token: Option<&str>) {
        if !self.registry.blacklist(access_token) {
            debug!("Logout presented a token that was already unusable");
        }
        if let Some(token) = refresh_token {
            self.registry.revoke_refresh_session(token);
        }
        info!("Logout completed");
    }

    /// Revokes every refresh session for the authenticated user, then
    /// blacklists the current access token.
    ///
    /// Returns the device count as revoked refresh sessions + 1; the +1 is
    /// the access token itself, which the refresh index does not track.
    pub fn logout_all(&self, access_token: &str, claims: &Claims) -> u32 {
        let revoked = self.registry.revoke_all_sessions_for_user(claims.sub);
        self.registry.blacklist(access_token);

        info!(user_id = %claims.sub, revoked, "Logged out of all sessions");

        revoked as u32 + 1
    }

    /// Looks up the authenticated user's sanitized record plus session
    /// summary.
    pub async fn current_user(
        &self,
        claims: &Claims,
    ) -> Result<(PublicUser, SessionInfo), AppError> {
        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::user_not_found("User not found"))?;

        let info = SessionInfo {
            active_sessions: self.registry.session_count_for_user(claims.sub),
            current_token_issued: claims.issued_at(),
        };

        Ok((user.sanitized(), info))
    }

    /// Point-in-time registry counters. Read-only.
    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Decodes a bearer token for diagnostics without mutating any state.
    ///
    /// A missing or malformed header is a validation error (the caller
    /// asked for diagnostics on nothing); verification failure is not — it
    /// is reported in the diagnostics themselves.
    pub fn inspect_token(&self, authorization: Option<&str>) -> Result<TokenDiagnostics, AppError> {
        let token = jwt::extract_bearer(authorization).ok_or_else(|| {
            AppError::validation("Expected an 'Authorization: Bearer <token>' header")
        })?;

        let diagnostics = match self.verifier.verify(token) {
            Ok(claims) => TokenDiagnostics {
                valid: true,
                blacklisted: self.registry.is_blacklisted(token),
                claims: Some(claims),
                token_length: token.len(),
            },
            Err(_) => TokenDiagnostics {
                valid: false,
                blacklisted: self.registry.is_blacklisted(token),
                claims: None,
                token_length: token.len(),
            },
        };

        Ok(diagnostics)
    }
}
