//! schoolrpc Observability Module
//!
//! Provides configurable observability features including:
//! - Structured logging to the console and to daily rolling files
//! - Metrics collection via Prometheus
//!
//! This module can be enabled or disabled at compile time via the `observability` feature flag.
//! At runtime, observability can be further controlled via the `OBSERVABILITY_ENABLED` environment variable.
//!
//! # Features
//!
//! - `observability` (default): Enables file logging and metrics
//!
//! Without the feature, [`init_tracing`] falls back to console logging and
//! every `track_*` helper compiles to nothing.
//!
//! # Examples
//!
//! ```no_run
//! use schoolrpc_observability::{init_metrics, init_tracing};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_tracing()?;
//!     let _metrics = init_metrics()?;
//!     // ... host application code ...
//!     Ok(())
//! }
//! ```

pub mod basic_logging;

#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

pub use basic_logging::init_basic_console_logging;

// Re-export PrometheusHandle type when observability is enabled
#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "observability")]
pub use logging::init_tracing;
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, is_observability_enabled, set_revoked_tokens, track_rate_limited,
    track_rpc_completed, track_token_issued, track_token_validation,
};

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    /// No-op observability check when feature disabled
    pub fn is_observability_enabled() -> bool {
        false
    }

    /// Console logging only when feature disabled
    pub fn init_tracing() -> anyhow::Result<()> {
        super::init_basic_console_logging();
        Ok(())
    }

    /// No-op metrics initialization when feature disabled
    pub fn init_metrics() -> anyhow::Result<Option<()>> {
        Ok(None)
    }

    // No-op tracking functions
    pub fn track_rpc_completed(_method: &str, _code: &str, _duration_secs: f64) {}
    pub fn track_rate_limited(_scope: &str) {}
    pub fn track_token_issued() {}
    pub fn track_token_validation(_outcome: &str) {}
    pub fn set_revoked_tokens(_count: usize) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
