//! # schoolrpc Config
//!
//! Configuration types for the schoolrpc middleware core.
//!
//! Every structure is loaded from environment variables and falls back to a
//! default when a variable is unset or unparsable:
//!
//! - [`jwt`]: token signing secret and lifetime
//! - [`rate_limit`]: fixed-window rate limiting policy
//! - [`auth`]: methods exempt from authentication
//! - [`revocation`]: revocation sweep cadence
//!
//! # Example
//!
//! ```ignore
//! use schoolrpc_config::AppConfig;
//!
//! dotenvy::dotenv().ok();
//! let config = AppConfig::from_env();
//! config.validate()?;
//! ```

pub mod auth;
pub mod jwt;
pub mod rate_limit;
pub mod revocation;

use chrono::{TimeDelta, Utc};
use thiserror::Error;

// Re-export commonly used types at crate root
pub use auth::AuthConfig;
pub use jwt::JwtConfig;
pub use rate_limit::{RateLimitConfig, RateLimitScope};
pub use revocation::RevocationConfig;

/// A configuration value that cannot be used to start the middleware core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT secret must not be empty")]
    EmptyJwtSecret,
    #[error("JWT access token expiry must be positive, got {0}")]
    NonPositiveTokenExpiry(i64),
    #[error("JWT access token expiry of {0} seconds is out of range")]
    TokenExpiryTooLarge(i64),
    #[error("rate limit window must be at least one second")]
    ZeroRateLimitWindow,
    #[error("revocation sweep interval must be at least one second")]
    ZeroSweepInterval,
}

/// All configuration needed by the middleware core.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
    pub revocation: RevocationConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            jwt: JwtConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            auth: AuthConfig::from_env(),
            revocation: RevocationConfig::from_env(),
        }
    }

    /// Rejects values that would make the core misbehave at runtime.
    ///
    /// A rate-limit threshold of zero is allowed: it rejects every call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.is_empty() {
            return Err(ConfigError::EmptyJwtSecret);
        }
        if self.jwt.access_token_expiry <= 0 {
            return Err(ConfigError::NonPositiveTokenExpiry(
                self.jwt.access_token_expiry,
            ));
        }
        // Tokens must expire at a representable instant.
        let expires_at = TimeDelta::try_seconds(self.jwt.access_token_expiry)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        if expires_at.is_none() {
            return Err(ConfigError::TokenExpiryTooLarge(
                self.jwt.access_token_expiry,
            ));
        }
        if self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::ZeroRateLimitWindow);
        }
        if self.revocation.sweep_interval_seconds == 0 {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }
}
