//! User lookup and credential verification port.
//!
//! The auth core never owns user records; it consumes this trait. The
//! bundled implementation is in-memory for single-node deployments.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use hapit_core::error::AppError;
use hapit_entity::User;

pub use memory::MemoryUserStore;

/// External collaborator that owns user records and credentials.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Verifies a username/password pair.
    ///
    /// Returns the matching user on success and `None` for both unknown
    /// users and wrong passwords — callers must not be able to tell the
    /// two apart.
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AppError>;

    /// Looks up a user by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
}
