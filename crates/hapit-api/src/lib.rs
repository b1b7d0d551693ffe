//! # hapit-api
//!
//! HTTP API layer for Hapit built on Axum.
//!
//! Provides the auth REST endpoints, the health check, extractors, DTOs,
//! and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
