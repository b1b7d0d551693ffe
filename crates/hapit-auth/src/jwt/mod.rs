//! Signed-token codec: claims, issuance, verification, header parsing.

pub mod claims;
pub mod issuer;
pub mod verifier;

pub use claims::{Claims, TokenKind};
pub use issuer::{TokenIssuer, TokenPair};
pub use verifier::TokenVerifier;

/// Issuer claim embedded in and required of every Hapit token.
pub const TOKEN_ISSUER: &str = "hapit-app";

/// Extracts the token from a `Bearer <token>` authorization header value.
///
/// Returns `None` for a missing or malformed header. This is a parse
/// helper, not a security check; absence is not an error here.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}
