//! Auth handlers — login, logout, refresh, me, stats, debug-token.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use validator::Validate;

use hapit_core::error::AppError;

use crate::dto::request::{LoginRequest, LogoutRequest, RefreshRequest};
use crate::dto::response::{
    DebugTokenResponse, LoginResponse, LogoutAllResponse, MeResponse, MessageResponse,
    RefreshResponse, StatsResponse,
};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let result = state.manager.login(&req.username, &req.password).await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        user: result.user,
        tokens: result.tokens,
    }))
}

/// POST /api/auth/logout
///
/// The body is optional; an access-token-only logout skips the refresh
/// revocation.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Option<Json<LogoutRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    state.manager.logout(&auth.token, req.refresh_token.as_deref());

    Ok(Json(MessageResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    }))
}

/// POST /api/auth/logout-all
pub async fn logout_all(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<LogoutAllResponse>, ApiError> {
    let terminated = state.manager.logout_all(&auth.token, &auth.claims);

    Ok(Json(LogoutAllResponse {
        success: true,
        message: format!("Logged out from {} devices", terminated),
        sessions_terminated: terminated,
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let tokens = state.manager.refresh(&req.refresh_token).await?;

    Ok(Json(RefreshResponse {
        success: true,
        message: "Tokens refreshed".to_string(),
        tokens,
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let (user, session) = state.manager.current_user(&auth.claims).await?;

    Ok(Json(MeResponse {
        success: true,
        user,
        session,
    }))
}

/// GET /api/auth/stats
pub async fn stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(StatsResponse {
        success: true,
        stats: state.manager.stats(),
    }))
}

/// GET /api/auth/debug-token
///
/// Decodes whatever token the Authorization header carries, valid or not.
/// Only a missing header is an error.
pub async fn debug_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DebugTokenResponse>, ApiError> {
    let authorization = headers.get("authorization").and_then(|v| v.to_str().ok());

    let token = state.manager.inspect_token(authorization)?;

    Ok(Json(DebugTokenResponse {
        success: true,
        token,
    }))
}
