//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hapit_auth::jwt::TokenPair;
use hapit_auth::manager::{SessionInfo, TokenDiagnostics};
use hapit_auth::registry::RegistryStats;
use hapit_entity::PublicUser;

/// Login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
    /// Sanitized user record.
    pub user: PublicUser,
    /// Issued token pair.
    pub tokens: TokenPair,
}

/// Token refresh response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
    /// Rotated token pair.
    pub tokens: TokenPair,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Always `true`.
    pub success: bool,
    /// Message.
    pub message: String,
}

/// Logout-all response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutAllResponse {
    /// Always `true`.
    pub success: bool,
    /// Message.
    pub message: String,
    /// Sessions terminated, the presented access token included.
    pub sessions_terminated: u32,
}

/// Current-user response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    /// Always `true`.
    pub success: bool,
    /// Sanitized user record.
    pub user: PublicUser,
    /// Session summary.
    pub session: SessionInfo,
}

/// Registry stats response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Always `true`.
    pub success: bool,
    /// Registry counters.
    pub stats: RegistryStats,
}

/// Token diagnostics response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugTokenResponse {
    /// Always `true` (diagnostics on an invalid token still succeed).
    pub success: bool,
    /// Decode diagnostics.
    pub token: TokenDiagnostics,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Server time.
    pub timestamp: DateTime<Utc>,
}
