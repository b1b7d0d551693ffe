//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Authentication and token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token TTL in hours.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_hours: u64,
    /// Refresh token TTL in days.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_days: u64,
    /// Absolute age ceiling for any token in days, enforced independently
    /// of the embedded expiry.
    #[serde(default = "default_max_token_age")]
    pub max_token_age_days: u64,
    /// Blacklist/refresh-index size that triggers an inline expiry sweep.
    #[serde(default = "default_sweep_high_water")]
    pub sweep_high_water: usize,
    /// Seconds between periodic registry cleanup sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_ttl_hours: default_access_ttl(),
            refresh_ttl_days: default_refresh_ttl(),
            max_token_age_days: default_max_token_age(),
            sweep_high_water: default_sweep_high_water(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_access_ttl() -> u64 {
    24
}

fn default_refresh_ttl() -> u64 {
    7
}

fn default_max_token_age() -> u64 {
    30
}

fn default_sweep_high_water() -> usize {
    1000
}

fn default_cleanup_interval() -> u64 {
    3600
}
