//! Rate limiting configuration for inbound calls.
//!
//! Rate limits protect the service from callers that flood it and keep the
//! cost of rejecting excess traffic low: the limiter runs before any token
//! verification or business logic.
//!
//! # Configuration
//!
//! Rate limits can be configured via environment variables:
//!
//! - `RATE_LIMIT_ENABLED`: Whether the limiter runs at all (default: true)
//! - `RATE_LIMIT_THRESHOLD`: Calls allowed per window per key (default: 50)
//! - `RATE_LIMIT_WINDOW_SECONDS`: Window length in seconds (default: 60)
//! - `RATE_LIMIT_SCOPE`: `peer` for one window per caller address, `global`
//!   for a single shared window (default: peer)
//!
//! # Rate Limiting Strategy
//!
//! The limiter uses fixed windows:
//!
//! - The first call for a key opens a window and counts as one
//! - Each further call inside the window increments the count
//! - Once the count reaches the threshold, calls are rejected until the
//!   window ends; rejected calls are not counted
//! - The first call after the window ends opens a fresh window
//!
//! # Example
//!
//! ```ignore
//! use schoolrpc_config::RateLimitConfig;
//!
//! let config = RateLimitConfig::from_env();
//! let window = config.window();
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which identity a rate-limit window is keyed on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RateLimitScope {
    /// One window per caller, keyed by the caller's network address.
    #[default]
    Peer,
    /// A single window shared by every caller.
    Global,
}

impl FromStr for RateLimitScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "peer" | "ip" => Ok(Self::Peer),
            "global" => Ok(Self::Global),
            other => Err(format!("unknown rate limit scope: {other}")),
        }
    }
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peer => f.write_str("peer"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// Rate limit configuration for the middleware core.
///
/// # Fields
///
/// - `enabled`: Whether the rate stage checks calls at all
/// - `threshold`: Maximum calls per key inside one window
/// - `window_seconds`: Length of a window
/// - `scope`: Whether windows are per caller or global
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether the rate stage is active.
    ///
    /// Load tests typically disable it so the limiter does not skew results.
    pub enabled: bool,

    /// Calls allowed per key within one window.
    pub threshold: u32,

    /// Window length in seconds.
    pub window_seconds: u64,

    /// Identity the windows are keyed on.
    pub scope: RateLimitScope,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 50,
            window_seconds: 60,
            scope: RateLimitScope::Peer,
        }
    }
}

impl RateLimitConfig {
    /// Creates a new `RateLimitConfig` from environment variables.
    ///
    /// Falls back to default values if environment variables are not set
    /// or cannot be parsed.
    ///
    /// # Environment Variables
    ///
    /// - `RATE_LIMIT_ENABLED`: Default true
    /// - `RATE_LIMIT_THRESHOLD`: Default 50
    /// - `RATE_LIMIT_WINDOW_SECONDS`: Default 60
    /// - `RATE_LIMIT_SCOPE`: Default peer
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enabled),
            threshold: std::env::var("RATE_LIMIT_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.threshold),
            window_seconds: std::env::var("RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.window_seconds),
            scope: std::env::var("RATE_LIMIT_SCOPE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.scope),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
