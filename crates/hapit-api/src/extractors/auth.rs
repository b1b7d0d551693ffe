//! `AuthUser` extractor — pulls the bearer token from the Authorization
//! header, runs the full authentication gate, and injects the claims.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use hapit_auth::jwt::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Extracted authenticated user context available in handlers.
///
/// Carries the raw token alongside the claims so logout flows can revoke
/// the exact credential that was presented.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Verified access token claims.
    pub claims: Claims,
    /// The raw bearer token as presented.
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok());

        let claims = state.manager.authenticate(authorization)?;

        // authenticate() succeeding implies the header parsed as a bearer.
        let token = hapit_auth::jwt::extract_bearer(authorization)
            .unwrap_or_default()
            .to_string();

        Ok(AuthUser { claims, token })
    }
}
