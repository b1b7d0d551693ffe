//! Direct tests for the token codec and session registry.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use hapit_auth::jwt::{Claims, TOKEN_ISSUER, TokenIssuer, TokenKind, TokenVerifier};
use hapit_auth::manager::AuthManager;
use hapit_auth::registry::SessionRegistry;
use hapit_auth::store::UserStore;
use hapit_core::config::auth::AuthConfig;
use hapit_core::error::{AppError, ErrorKind};
use hapit_entity::User;

const TEST_SECRET: &str = "test-secret-key-for-session-tests";

fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        ..AuthConfig::default()
    }
}

fn test_user(username: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: "unused".to_string(),
        name: format!("{} Test", username),
        email: None,
        created_at: now,
        updated_at: now,
    }
}

fn build_registry(config: &AuthConfig) -> SessionRegistry {
    let issuer = Arc::new(TokenIssuer::new(config));
    let verifier = Arc::new(TokenVerifier::new(config));
    SessionRegistry::new(issuer, verifier, config)
}

/// Signs arbitrary claims with the test secret, bypassing the issuer.
fn sign_claims(claims: &Claims) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("Failed to sign claims")
}

fn claims_at(user: &User, kind: TokenKind, iat: i64, exp: i64) -> Claims {
    Claims {
        sub: user.id,
        username: user.username.clone(),
        name: None,
        iss: TOKEN_ISSUER.to_string(),
        iat,
        exp,
        kind,
    }
}

// ── Codec ────────────────────────────────────────────────────────

#[test]
fn issued_tokens_roundtrip_their_claims() {
    let config = test_config();
    let issuer = TokenIssuer::new(&config);
    let verifier = TokenVerifier::new(&config);
    let user = test_user("alice");

    let token = issuer.issue_access_token(&user).expect("issue failed");
    let claims = verifier.verify(&token).expect("verify failed");

    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.name.as_deref(), Some("alice Test"));
    assert_eq!(claims.iss, TOKEN_ISSUER);
    assert_eq!(claims.kind, TokenKind::Access);
}

#[test]
fn refresh_tokens_carry_the_refresh_kind_and_no_name() {
    let config = test_config();
    let issuer = TokenIssuer::new(&config);
    let verifier = TokenVerifier::new(&config);
    let user = test_user("alice");

    let token = issuer.issue_refresh_token(&user).expect("issue failed");
    let claims = verifier.verify(&token).expect("verify failed");

    assert_eq!(claims.kind, TokenKind::Refresh);
    assert!(claims.name.is_none());
}

#[test]
fn expired_tokens_fail_verification() {
    let config = test_config();
    let verifier = TokenVerifier::new(&config);
    let user = test_user("alice");

    let now = Utc::now().timestamp();
    let token = sign_claims(&claims_at(&user, TokenKind::Access, now - 100, now - 50));

    let err = verifier.verify(&token).expect_err("expired token accepted");
    assert_eq!(err.kind, ErrorKind::InvalidToken);
    assert_eq!(err.message, "Invalid or expired token");
}

#[test]
fn tokens_issued_in_the_future_fail_verification() {
    let config = test_config();
    let verifier = TokenVerifier::new(&config);
    let user = test_user("alice");

    let now = Utc::now().timestamp();
    let token = sign_claims(&claims_at(&user, TokenKind::Access, now + 3600, now + 7200));

    assert!(verifier.verify(&token).is_err());
}

#[test]
fn tokens_over_the_age_ceiling_fail_verification() {
    let config = test_config();
    let verifier = TokenVerifier::new(&config);
    let user = test_user("alice");

    // Issued 31 days ago with a far-future expiry; the 30-day ceiling wins.
    let now = Utc::now().timestamp();
    let token = sign_claims(&claims_at(
        &user,
        TokenKind::Access,
        now - 31 * 86400,
        now + 86400,
    ));

    assert!(verifier.verify(&token).is_err());
}

#[test]
fn tokens_with_the_wrong_issuer_fail_verification() {
    let config = test_config();
    let verifier = TokenVerifier::new(&config);
    let user = test_user("alice");

    let now = Utc::now().timestamp();
    let mut claims = claims_at(&user, TokenKind::Access, now, now + 3600);
    claims.iss = "someone-else".to_string();

    assert!(verifier.verify(&sign_claims(&claims)).is_err());
}

#[test]
fn tokens_signed_with_another_secret_fail_verification() {
    let config = test_config();
    let verifier = TokenVerifier::new(&config);

    let other = AuthConfig {
        jwt_secret: "a-completely-different-secret".to_string(),
        ..AuthConfig::default()
    };
    let foreign = TokenIssuer::new(&other)
        .issue_access_token(&test_user("mallory"))
        .expect("issue failed");

    assert!(verifier.verify(&foreign).is_err());
}

// ── Blacklist ────────────────────────────────────────────────────

#[test]
fn blacklist_records_valid_tokens() {
    let config = test_config();
    let issuer = TokenIssuer::new(&config);
    let registry = build_registry(&config);
    let user = test_user("alice");

    let token = issuer.issue_access_token(&user).expect("issue failed");

    assert!(!registry.is_blacklisted(&token));
    assert!(registry.blacklist(&token));
    assert!(registry.is_blacklisted(&token));
}

#[test]
fn blacklist_ignores_unverifiable_tokens() {
    let config = test_config();
    let registry = build_registry(&config);

    assert!(!registry.blacklist("not-a-token"));
    assert!(!registry.is_blacklisted("not-a-token"));
    assert_eq!(registry.stats().blacklisted_tokens, 0);
}

// ── Refresh sessions ─────────────────────────────────────────────

#[test]
fn store_rejects_access_tokens_as_sessions() {
    let config = test_config();
    let issuer = TokenIssuer::new(&config);
    let registry = build_registry(&config);
    let user = test_user("alice");

    let access = issuer.issue_access_token(&user).expect("issue failed");

    assert!(!registry.store_refresh_session(&access, user.id));
    assert_eq!(registry.stats().active_refresh_tokens, 0);
}

#[test]
fn stored_sessions_redeem_to_their_owner() {
    let config = test_config();
    let issuer = TokenIssuer::new(&config);
    let registry = build_registry(&config);
    let user = test_user("alice");

    let refresh = issuer.issue_refresh_token(&user).expect("issue failed");

    assert!(registry.store_refresh_session(&refresh, user.id));
    assert_eq!(registry.redeem_refresh_session(&refresh), Some(user.id));
    // Redeem does not consume; rotation or revocation does.
    assert_eq!(registry.redeem_refresh_session(&refresh), Some(user.id));
}

#[test]
fn expired_stored_sessions_are_evicted_on_redeem() {
    // A zero age ceiling expires every token one second after issuance.
    let config = AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        max_token_age_days: 0,
        ..AuthConfig::default()
    };
    let registry = build_registry(&config);
    let user = test_user("alice");

    // Issued-at sits just inside the clock-skew leeway so the store
    // accepts the token while it is still fresh.
    let now = Utc::now().timestamp();
    let token = sign_claims(&claims_at(&user, TokenKind::Refresh, now + 2, now + 3600));

    assert!(registry.store_refresh_session(&token, user.id));
    assert_eq!(registry.session_count_for_user(user.id), 1);

    std::thread::sleep(std::time::Duration::from_millis(3500));

    // Redeem fails closed and garbage-collects the entry from both indexes.
    assert_eq!(registry.redeem_refresh_session(&token), None);
    assert_eq!(registry.session_count_for_user(user.id), 0);
    assert_eq!(registry.stats().active_refresh_tokens, 0);
}

#[test]
fn unknown_tokens_do_not_redeem() {
    let config = test_config();
    let registry = build_registry(&config);

    assert_eq!(registry.redeem_refresh_session("never-stored"), None);
}

#[test]
fn revoke_removes_a_single_session() {
    let config = test_config();
    let issuer = TokenIssuer::new(&config);
    let registry = build_registry(&config);
    let user = test_user("alice");

    let refresh = issuer.issue_refresh_token(&user).expect("issue failed");
    registry.store_refresh_session(&refresh, user.id);

    assert_eq!(registry.revoke_refresh_session(&refresh), Some(user.id));
    assert_eq!(registry.revoke_refresh_session(&refresh), None);
    assert_eq!(registry.redeem_refresh_session(&refresh), None);
    assert_eq!(registry.session_count_for_user(user.id), 0);
}

#[test]
fn revoke_all_only_touches_the_target_user() {
    let config = test_config();
    let registry = build_registry(&config);
    let alice = test_user("alice");
    let bob = test_user("bob");

    // Distinct iat values keep the tokens distinct.
    let now = Utc::now().timestamp();
    let a1 = sign_claims(&claims_at(&alice, TokenKind::Refresh, now - 2, now + 3600));
    let a2 = sign_claims(&claims_at(&alice, TokenKind::Refresh, now - 1, now + 3600));
    let b1 = sign_claims(&claims_at(&bob, TokenKind::Refresh, now - 1, now + 3600));

    assert!(registry.store_refresh_session(&a1, alice.id));
    assert!(registry.store_refresh_session(&a2, alice.id));
    assert!(registry.store_refresh_session(&b1, bob.id));

    assert_eq!(registry.revoke_all_sessions_for_user(alice.id), 2);
    assert_eq!(registry.revoke_all_sessions_for_user(alice.id), 0);

    assert_eq!(registry.session_count_for_user(alice.id), 0);
    assert_eq!(registry.redeem_refresh_session(&b1), Some(bob.id));
}

// ── Rotation ─────────────────────────────────────────────────────

#[test]
fn rotate_swaps_the_old_session_for_the_new() {
    let config = test_config();
    let registry = build_registry(&config);
    let user = test_user("alice");

    // Backdated a second so the rotated token cannot collide with it.
    let now = Utc::now().timestamp();
    let old = sign_claims(&claims_at(&user, TokenKind::Refresh, now - 1, now + 3600));
    assert!(registry.store_refresh_session(&old, user.id));

    let pair = registry.rotate(&old, &user).expect("rotate failed");

    assert_ne!(pair.refresh_token, old);
    assert_eq!(registry.redeem_refresh_session(&old), None);
    assert_eq!(
        registry.redeem_refresh_session(&pair.refresh_token),
        Some(user.id)
    );
    assert_eq!(registry.session_count_for_user(user.id), 1);
}

#[test]
fn rotate_fails_for_unknown_sessions() {
    let config = test_config();
    let issuer = TokenIssuer::new(&config);
    let registry = build_registry(&config);
    let user = test_user("alice");

    let never_stored = issuer.issue_refresh_token(&user).expect("issue failed");

    let err = registry
        .rotate(&never_stored, &user)
        .expect_err("rotated an unknown session");
    assert_eq!(err.kind, ErrorKind::SessionNotFound);
}

/// User store that revokes the session it was handed during lookup,
/// reproducing a concurrent refresh winning between redeem and rotation.
struct RevokingStore {
    user: User,
    registry: Arc<SessionRegistry>,
    token: String,
}

#[async_trait]
impl UserStore for RevokingStore {
    async fn verify_credentials(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(Some(self.user.clone()))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, AppError> {
        self.registry.revoke_refresh_session(&self.token);
        Ok(Some(self.user.clone()))
    }
}

#[tokio::test]
async fn refresh_whose_session_vanishes_mid_flow_reports_invalid_token() {
    let config = test_config();
    let issuer = Arc::new(TokenIssuer::new(&config));
    let verifier = Arc::new(TokenVerifier::new(&config));
    let registry = Arc::new(SessionRegistry::new(
        Arc::clone(&issuer),
        Arc::clone(&verifier),
        &config,
    ));
    let user = test_user("alice");

    let refresh = issuer.issue_refresh_token(&user).expect("issue failed");
    assert!(registry.store_refresh_session(&refresh, user.id));

    let store = Arc::new(RevokingStore {
        user: user.clone(),
        registry: Arc::clone(&registry),
        token: refresh.clone(),
    });
    let manager = AuthManager::new(issuer, verifier, Arc::clone(&registry), store);

    // The session disappears during the user lookup; the loser must see
    // the same opaque 401-mapped outcome as any stale refresh token, not
    // a session-not-found 404.
    let err = manager
        .refresh(&refresh)
        .await
        .expect_err("refreshed a revoked session");
    assert_eq!(err.kind, ErrorKind::InvalidToken);
    assert_eq!(err.message, "Invalid or expired refresh token");
}

// ── Cleanup and stats ────────────────────────────────────────────

#[test]
fn cleanup_leaves_live_entries_alone() {
    let config = test_config();
    let issuer = TokenIssuer::new(&config);
    let registry = build_registry(&config);
    let user = test_user("alice");

    let access = issuer.issue_access_token(&user).expect("issue failed");
    let refresh = issuer.issue_refresh_token(&user).expect("issue failed");
    registry.blacklist(&access);
    registry.store_refresh_session(&refresh, user.id);

    let report = registry.cleanup_expired();

    assert_eq!(report.blacklisted_removed, 0);
    assert_eq!(report.refresh_removed, 0);
    assert!(registry.is_blacklisted(&access));
    assert_eq!(registry.redeem_refresh_session(&refresh), Some(user.id));
}

#[test]
fn cleanup_removes_expired_entries_from_both_indexes() {
    let config = AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        max_token_age_days: 0,
        ..AuthConfig::default()
    };
    let registry = build_registry(&config);
    let user = test_user("alice");

    let now = Utc::now().timestamp();
    let access = sign_claims(&claims_at(&user, TokenKind::Access, now + 2, now + 3600));
    let r1 = sign_claims(&claims_at(&user, TokenKind::Refresh, now + 1, now + 3600));
    let r2 = sign_claims(&claims_at(&user, TokenKind::Refresh, now + 2, now + 3600));

    assert!(registry.blacklist(&access));
    assert!(registry.store_refresh_session(&r1, user.id));
    assert!(registry.store_refresh_session(&r2, user.id));

    std::thread::sleep(std::time::Duration::from_millis(3500));

    let report = registry.cleanup_expired();
    assert_eq!(report.blacklisted_removed, 1);
    assert_eq!(report.refresh_removed, 2);

    let stats = registry.stats();
    assert_eq!(stats.blacklisted_tokens, 0);
    assert_eq!(stats.active_refresh_tokens, 0);
    assert_eq!(stats.users_with_sessions, 0);
}

#[test]
fn crossing_the_high_water_mark_sweeps_expired_sessions_inline() {
    let config = AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        max_token_age_days: 0,
        sweep_high_water: 1,
        ..AuthConfig::default()
    };
    let registry = build_registry(&config);
    let user = test_user("alice");

    let now = Utc::now().timestamp();
    let a = sign_claims(&claims_at(&user, TokenKind::Refresh, now + 1, now + 3600));
    let b = sign_claims(&claims_at(&user, TokenKind::Refresh, now + 2, now + 3600));
    assert!(registry.store_refresh_session(&a, user.id));
    assert!(registry.store_refresh_session(&b, user.id));

    std::thread::sleep(std::time::Duration::from_millis(3500));

    // The index sits past the high-water mark, so this store sweeps the
    // two expired sessions before inserting the fresh one.
    let later = Utc::now().timestamp();
    let fresh = sign_claims(&claims_at(&user, TokenKind::Refresh, later + 2, later + 3600));
    assert!(registry.store_refresh_session(&fresh, user.id));

    assert_eq!(registry.stats().active_refresh_tokens, 1);
    assert_eq!(registry.redeem_refresh_session(&a), None);
    assert_eq!(registry.redeem_refresh_session(&fresh), Some(user.id));
}

#[test]
fn stats_count_each_index() {
    let config = test_config();
    let issuer = TokenIssuer::new(&config);
    let registry = build_registry(&config);
    let alice = test_user("alice");
    let bob = test_user("bob");

    let access = issuer.issue_access_token(&alice).expect("issue failed");
    registry.blacklist(&access);
    let a = issuer.issue_refresh_token(&alice).expect("issue failed");
    let b = issuer.issue_refresh_token(&bob).expect("issue failed");
    registry.store_refresh_session(&a, alice.id);
    registry.store_refresh_session(&b, bob.id);

    let stats = registry.stats();
    assert_eq!(stats.blacklisted_tokens, 1);
    assert_eq!(stats.active_refresh_tokens, 2);
    assert_eq!(stats.users_with_sessions, 2);
}
