//! Application state shared across all handlers.

use std::sync::Arc;

use hapit_auth::manager::AuthManager;
use hapit_auth::registry::SessionRegistry;
use hapit_auth::store::MemoryUserStore;
use hapit_core::config::AppConfig;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Orchestrated auth flows
    pub manager: Arc<AuthManager>,
    /// Token blacklist and refresh session tracking
    pub registry: Arc<SessionRegistry>,
    /// In-memory user records
    pub users: Arc<MemoryUserStore>,
}
