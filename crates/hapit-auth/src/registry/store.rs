//! In-memory session state: blacklist plus refresh-token indexes.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use hapit_core::config::auth::AuthConfig;
use hapit_core::error::AppError;
use hapit_entity::User;

use crate::jwt::{TokenIssuer, TokenKind, TokenPair, TokenVerifier};

/// Point-in-time registry counters for observability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Revoked access tokens currently retained.
    pub blacklisted_tokens: usize,
    /// Active refresh sessions across all users.
    pub active_refresh_tokens: usize,
    /// Users with at least one active refresh session.
    pub users_with_sessions: usize,
}

/// Outcome of an expiry sweep.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Expired blacklist entries removed.
    pub blacklisted_removed: usize,
    /// Expired refresh sessions removed.
    pub refresh_removed: usize,
}

/// The two index structures owned exclusively by the registry.
///
/// Invariant: every token in `refresh_index` appears in exactly one user's
/// `user_sessions` set, and vice versa. All mutation happens under the one
/// registry lock, so the bijection is never observable broken.
#[derive(Debug, Default)]
struct RegistryInner {
    /// Revoked access tokens, retained until natural expiry.
    blacklist: HashSet<String>,
    /// Forward index: refresh token -> owning user.
    refresh_index: HashMap<String, Uuid>,
    /// Reverse index: user -> that user's active refresh tokens.
    user_sessions: HashMap<Uuid, HashSet<String>>,
}

/// Tracks revoked access tokens and active refresh sessions.
///
/// Single process-wide instance, constructed once at startup and handed to
/// all flows by reference; tests construct isolated instances.
pub struct SessionRegistry {
    /// Codec for issuing rotated token pairs.
    issuer: Arc<TokenIssuer>,
    /// Codec for expiry checks during verification and sweeps.
    verifier: Arc<TokenVerifier>,
    /// Index size that triggers an inline expiry sweep.
    sweep_high_water: usize,
    /// All mutable state, behind one lock.
    inner: Mutex<RegistryInner>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sweep_high_water", &self.sweep_high_water)
            .finish()
    }
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new(issuer: Arc<TokenIssuer>, verifier: Arc<TokenVerifier>, config: &AuthConfig) -> Self {
        Self {
            issuer,
            verifier,
            sweep_high_water: config.sweep_high_water,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Revokes an access token by recording it until its natural expiry.
    ///
    /// A token that fails verification cannot be usefully blacklisted and
    /// is ignored, returning `false`. Once the blacklist crosses the
    /// high-water mark, an inline sweep drops entries that have since
    /// expired; the sweep is best-effort and never fails the call.
    pub fn blacklist(&self, token: &str) -> bool {
        if self.verifier.verify(token).is_err() {
            debug!("Skipping blacklist of token that fails verification");
            return false;
        }

        let mut inner = self.lock();
        inner.blacklist.insert(token.to_string());
        if inner.blacklist.len() > self.sweep_high_water {
            let removed = self.sweep_blacklist(&mut inner);
            info!(removed, "Blacklist high-water sweep completed");
        }
        true
    }

    /// Membership check; pure lookup, no side effects.
    pub fn is_blacklisted(&self, token: &str) -> bool {
        self.lock().blacklist.contains(token)
    }

    /// Registers a refresh session for `user_id`.
    ///
    /// Rejects tokens that fail verification or are not refresh tokens,
    /// returning `false`. The refresh index gets the same high-water sweep
    /// as the blacklist.
    pub fn store_refresh_session(&self, token: &str, user_id: Uuid) -> bool {
        let claims = match self.verifier.verify(token) {
            Ok(claims) => claims,
            Err(_) => {
                debug!("Refusing to store refresh session for unverifiable token");
                return false;
            }
        };
        if claims.kind != TokenKind::Refresh {
            warn!(user_id = %user_id, "Refusing to store non-refresh token as a session");
            return false;
        }

        let mut inner = self.lock();
        if inner.refresh_index.len() > self.sweep_high_water {
            let removed = self.sweep_refresh(&mut inner);
            info!(removed, "Refresh index high-water sweep completed");
        }
        Self::insert_session(&mut inner, token, user_id);
        true
    }

    /// Validates a stored refresh token and returns its owning user.
    ///
    /// Fails closed: unknown tokens, tokens that no longer verify, and
    /// non-refresh tokens all yield `None`. A stored token that fails
    /// verification (expired or tampered) is evicted from both indexes as
    /// a side effect.
    pub fn redeem_refresh_session(&self, token: &str) -> Option<Uuid> {
        let mut inner = self.lock();
        let user_id = *inner.refresh_index.get(token)?;

        match self.verifier.verify(token) {
            Ok(claims) if claims.kind == TokenKind::Refresh => Some(user_id),
            Ok(_) => None,
            Err(_) => {
                // Garbage collection on read.
                Self::remove_session(&mut inner, token);
                None
            }
        }
    }

    /// Removes one refresh session, returning the owning user if it existed.
    pub fn revoke_refresh_session(&self, token: &str) -> Option<Uuid> {
        Self::remove_session(&mut self.lock(), token)
    }

    /// Removes every refresh session owned by `user_id`.
    ///
    /// Returns how many were removed (0 if none existed). Other users'
    /// sessions are untouched.
    pub fn revoke_all_sessions_for_user(&self, user_id: Uuid) -> usize {
        let mut inner = self.lock();
        let Some(tokens) = inner.user_sessions.remove(&user_id) else {
            return 0;
        };
        for token in &tokens {
            inner.refresh_index.remove(token);
        }
        tokens.len()
    }

    /// Active refresh session count for one user.
    pub fn session_count_for_user(&self, user_id: Uuid) -> usize {
        self.lock()
            .user_sessions
            .get(&user_id)
            .map_or(0, HashSet::len)
    }

    /// Rotates a refresh session: retires `old_token` and registers a
    /// freshly issued pair for `user`, all under one lock acquisition.
    ///
    /// There is no window in which the old token is gone but the new one
    /// unregistered. Fails closed if the old token is unknown, no longer
    /// verifies, or is not a refresh token.
    pub fn rotate(&self, old_token: &str, user: &User) -> Result<TokenPair, AppError> {
        let mut inner = self.lock();

        if !inner.refresh_index.contains_key(old_token) {
            return Err(AppError::session_not_found("Refresh session not found"));
        }

        let claims = match self.verifier.verify(old_token) {
            Ok(claims) => claims,
            Err(e) => {
                Self::remove_session(&mut inner, old_token);
                return Err(e);
            }
        };
        if claims.kind != TokenKind::Refresh {
            return Err(AppError::wrong_token_kind("Refresh token required"));
        }

        let pair = self.issuer.issue_pair(user)?;
        Self::remove_session(&mut inner, old_token);
        Self::insert_session(&mut inner, &pair.refresh_token, user.id);

        Ok(pair)
    }

    /// Drops every blacklist entry and refresh session that has expired.
    ///
    /// Called inline once an index crosses the high-water mark, and by the
    /// periodic cleanup task. Best-effort; never fails its caller.
    pub fn cleanup_expired(&self) -> CleanupReport {
        let mut inner = self.lock();
        let report = CleanupReport {
            blacklisted_removed: self.sweep_blacklist(&mut inner),
            refresh_removed: self.sweep_refresh(&mut inner),
        };
        info!(
            blacklisted_removed = report.blacklisted_removed,
            refresh_removed = report.refresh_removed,
            "Registry cleanup completed"
        );
        report
    }

    /// Point-in-time snapshot of the registry counters.
    pub fn stats(&self) -> RegistryStats {
        let inner = self.lock();
        RegistryStats {
            blacklisted_tokens: inner.blacklist.len(),
            active_refresh_tokens: inner.refresh_index.len(),
            users_with_sessions: inner.user_sessions.len(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        // Registry operations never panic while holding the lock; a
        // poisoned mutex only occurs if that assumption breaks, at which
        // point the state is unusable anyway.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts into both indexes, preserving the bijection.
    fn insert_session(inner: &mut RegistryInner, token: &str, user_id: Uuid) {
        inner.refresh_index.insert(token.to_string(), user_id);
        inner
            .user_sessions
            .entry(user_id)
            .or_default()
            .insert(token.to_string());
    }

    /// Removes from both indexes, preserving the bijection.
    fn remove_session(inner: &mut RegistryInner, token: &str) -> Option<Uuid> {
        let user_id = inner.refresh_index.remove(token)?;
        if let Some(sessions) = inner.user_sessions.get_mut(&user_id) {
            sessions.remove(token);
            if sessions.is_empty() {
                inner.user_sessions.remove(&user_id);
            }
        }
        Some(user_id)
    }

    fn sweep_blacklist(&self, inner: &mut RegistryInner) -> usize {
        let expired: Vec<String> = inner
            .blacklist
            .iter()
            .filter(|token| self.verifier.verify(token).is_err())
            .cloned()
            .collect();
        for token in &expired {
            inner.blacklist.remove(token);
        }
        expired.len()
    }

    fn sweep_refresh(&self, inner: &mut RegistryInner) -> usize {
        let expired: Vec<String> = inner
            .refresh_index
            .keys()
            .filter(|token| self.verifier.verify(token).is_err())
            .cloned()
            .collect();
        for token in &expired {
            Self::remove_session(inner, token);
        }
        expired.len()
    }
}
