//! Hapit Server — authentication and session service
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use hapit_auth::jwt::{TokenIssuer, TokenVerifier};
use hapit_auth::manager::AuthManager;
use hapit_auth::registry::{RegistryCleanup, SessionRegistry};
use hapit_auth::store::{MemoryUserStore, UserStore};
use hapit_core::config::AppConfig;
use hapit_core::error::AppError;

#[tokio::main]
async fn main() {
    let env = std::env::var("HAPIT_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Hapit v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Initialize auth system ───────────────────────────
    let issuer = Arc::new(TokenIssuer::new(&config.auth));
    let verifier = Arc::new(TokenVerifier::new(&config.auth));
    let registry = Arc::new(SessionRegistry::new(
        Arc::clone(&issuer),
        Arc::clone(&verifier),
        &config.auth,
    ));
    let users = Arc::new(MemoryUserStore::new());

    seed_demo_users(&users)?;

    let manager = Arc::new(AuthManager::new(
        Arc::clone(&issuer),
        Arc::clone(&verifier),
        Arc::clone(&registry),
        Arc::clone(&users) as Arc<dyn UserStore>,
    ));
    tracing::info!("Authentication system initialized");

    // ── Step 2: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 3: Start registry cleanup task ──────────────────────
    let cleanup = RegistryCleanup::new(
        Arc::clone(&registry),
        Duration::from_secs(config.auth.cleanup_interval_seconds),
    );
    let cleanup_handle = tokio::spawn(cleanup.run(shutdown_rx.clone()));
    tracing::info!("Registry cleanup task started");

    // ── Step 4: Build and start HTTP server ──────────────────────
    let app_state = hapit_api::state::AppState {
        config: Arc::new(config.clone()),
        manager,
        registry,
        users,
    };

    let app = hapit_api::router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Hapit server listening on {}", addr);

    // ── Step 5: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // ── Step 6: Wait for background tasks ────────────────────────
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let _ = tokio::time::timeout(grace, cleanup_handle).await;

    tracing::info!("Hapit server shut down gracefully");
    Ok(())
}

/// Seed the bundled demo accounts used by the in-memory store.
fn seed_demo_users(users: &MemoryUserStore) -> Result<(), AppError> {
    users.create_user("demo", "password123", "Demo User", Some("demo@example.com"))?;
    users.create_user("admin", "admin123", "Administrator", Some("admin@example.com"))?;
    tracing::info!("Seeded demo users");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
