//! In-memory user store for single-node deployments and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use hapit_core::error::AppError;
use hapit_entity::User;

use crate::password;

use super::UserStore;

/// Internal state for the memory-based user store.
#[derive(Debug, Default)]
struct InnerState {
    /// All users by ID.
    users: HashMap<Uuid, User>,
    /// Username -> user ID for quick lookup.
    username_index: HashMap<String, Uuid>,
}

/// In-memory [`UserStore`] backed by a mutex-guarded pair of maps.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    /// Protected inner state.
    state: Mutex<InnerState>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a user, hashing the password.
    ///
    /// Fails with a conflict if the username is taken.
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        name: &str,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        let password_hash = password::hash_password(password)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            name: name.to_string(),
            email: email.map(String::from),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.lock();
        if state.username_index.contains_key(username) {
            return Err(AppError::conflict("Username already exists"));
        }
        state.username_index.insert(username.to_string(), user.id);
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    /// Deletes a user, returning the record if it existed.
    ///
    /// Refresh sessions held by the user are not touched here; a redeem
    /// against a deleted user surfaces as a detached session upstream.
    pub fn remove_user(&self, id: Uuid) -> Option<User> {
        let mut state = self.lock();
        let user = state.users.remove(&id)?;
        state.username_index.remove(&user.username);
        Some(user)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InnerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        let user = {
            let state = self.lock();
            let Some(id) = state.username_index.get(username) else {
                return Ok(None);
            };
            state.users.get(id).cloned()
        };

        // Hash verification happens outside the lock; it is the slow part.
        match user {
            Some(user) if password::verify_password(password, &user.password_hash)? => {
                Ok(Some(user))
            }
            _ => Ok(None),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.get(&id).cloned())
    }
}
