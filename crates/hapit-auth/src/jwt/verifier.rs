//! Token validation with uniform failure reporting.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use hapit_core::config::auth::AuthConfig;
use hapit_core::error::AppError;

use super::TOKEN_ISSUER;
use super::claims::Claims;

/// Clock skew tolerance in seconds.
const LEEWAY_SECONDS: i64 = 5;

/// Validates signed tokens.
///
/// Every failure mode — malformed structure, bad signature, issuer
/// mismatch, expiry, future issued-at, age ceiling — surfaces as the same
/// opaque [`hapit_core::error::ErrorKind::InvalidToken`] so callers cannot
/// probe which check rejected a token. Blacklist and kind checks are
/// layered on top by the caller.
#[derive(Clone)]
pub struct TokenVerifier {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Absolute age ceiling in seconds, independent of the `exp` claim.
    max_token_age_seconds: i64,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = LEEWAY_SECONDS as u64;
        validation.set_issuer(&[TOKEN_ISSUER]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            max_token_age_seconds: config.max_token_age_days as i64 * 86400,
        }
    }

    /// Decodes and validates a token string, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AppError::invalid_token())?;

        let claims = token_data.claims;
        let now = Utc::now().timestamp();

        // Clock checks jsonwebtoken does not cover: tokens from the future
        // and an absolute age ceiling regardless of the stated expiry.
        if claims.iat > now + LEEWAY_SECONDS {
            return Err(AppError::invalid_token());
        }
        if now - claims.iat > self.max_token_age_seconds {
            return Err(AppError::invalid_token());
        }

        Ok(claims)
    }
}
