//! # hapit-auth
//!
//! Authentication core for the Hapit service: token issuance and
//! verification, session tracking, and the orchestrated auth flows.
//!
//! ## Modules
//!
//! - `jwt` — signed token creation, validation, and bearer-header parsing
//! - `registry` — token blacklist and per-user refresh session tracking
//! - `password` — Argon2id password hashing
//! - `store` — user lookup port and its in-memory implementation
//! - `manager` — login / refresh / logout / introspection flows

pub mod jwt;
pub mod manager;
pub mod password;
pub mod registry;
pub mod store;

pub use jwt::{Claims, TokenIssuer, TokenKind, TokenPair, TokenVerifier};
pub use manager::AuthManager;
pub use registry::{RegistryCleanup, SessionRegistry};
pub use store::{MemoryUserStore, UserStore};
