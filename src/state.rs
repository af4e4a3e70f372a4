use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use schoolrpc_auth::{RevocationStore, TokenCodec};
use schoolrpc_config::AppConfig;
use schoolrpc_core::{PeriodicTask, SharedClock, SystemClock};
use schoolrpc_observability::set_revoked_tokens;

use crate::pipeline::Pipeline;
use crate::rate_limiter::RateLimiter;

/// Process-wide state shared by the pipeline and the handlers.
///
/// Every field is cheap to clone and clones share the same underlying data.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub codec: Arc<TokenCodec>,
    pub revocations: RevocationStore,
    pub limiter: RateLimiter,
    pub clock: SharedClock,
}

impl AppState {
    pub fn from_config(config: AppConfig, clock: SharedClock) -> Self {
        let codec = TokenCodec::new(&config.jwt, clock.clone());
        let limiter = RateLimiter::from_config(&config.rate_limit, clock.clone());

        Self {
            codec: Arc::new(codec),
            revocations: RevocationStore::new(clock.clone()),
            limiter,
            config: Arc::new(config),
            clock,
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_state(self)
    }

    /// Starts the background revocation sweep and rate-window purge.
    ///
    /// Both stop when the returned [`Maintenance`] is stopped or dropped.
    pub fn spawn_maintenance(&self) -> Maintenance {
        let interval = self.config.revocation.sweep_interval();

        let sweeper = self.revocations.spawn_sweeper(interval);

        let limiter = self.limiter.clone();
        let revocations = self.revocations.clone();
        let purge = PeriodicTask::spawn("rate-limit-purge", self.limiter_purge_interval(), move || {
            let limiter = limiter.clone();
            let revocations = revocations.clone();
            async move {
                limiter.purge_expired().await;
                set_revoked_tokens(revocations.len().await);
            }
        });

        Maintenance { sweeper, purge }
    }

    fn limiter_purge_interval(&self) -> Duration {
        self.config.rate_limit.window().max(Duration::from_secs(1))
    }
}

/// Handles to the background maintenance tasks.
#[derive(Debug)]
pub struct Maintenance {
    sweeper: PeriodicTask,
    purge: PeriodicTask,
}

impl Maintenance {
    pub fn is_running(&self) -> bool {
        !self.sweeper.is_finished() && !self.purge.is_finished()
    }

    pub async fn stop(self) {
        self.sweeper.stop().await;
        self.purge.stop().await;
    }
}

/// Builds the application state from environment variables.
///
/// # Errors
///
/// Fails if the configuration does not pass [`AppConfig::validate`].
pub fn init_app_state() -> anyhow::Result<AppState> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    config.validate().context("invalid configuration")?;

    info!(
        rate_limit_enabled = config.rate_limit.enabled,
        rate_limit_threshold = config.rate_limit.threshold,
        rate_limit_window_secs = config.rate_limit.window_seconds,
        rate_limit_scope = %config.rate_limit.scope,
        "application state initialized"
    );

    Ok(AppState::from_config(config, SystemClock::shared()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use schoolrpc_core::{Clock, ManualClock};
    use schoolrpc_auth::Role;

    #[test]
    fn test_validated_long_expiry_builds_working_state() {
        let mut config = AppConfig::default();
        config.jwt.access_token_expiry = 100 * 365 * 24 * 3600;
        assert!(config.validate().is_ok());

        let state = AppState::from_config(config, ManualClock::starting_now().shared());
        let token = state.codec.issue_default("1", "jdoe", Role::User).unwrap();
        assert!(state.codec.verify(&token).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_maintenance_sweeps_revocations() {
        let clock = ManualClock::starting_now();
        let mut config = AppConfig::default();
        config.revocation.sweep_interval_seconds = 10;
        let state = AppState::from_config(config, clock.shared());

        state
            .revocations
            .revoke("token", clock.now() + TimeDelta::seconds(5))
            .await;
        let maintenance = state.spawn_maintenance();
        assert!(maintenance.is_running());

        clock.advance(TimeDelta::seconds(6));
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(state.revocations.is_empty().await);

        maintenance.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_maintenance_purges_rate_windows() {
        let clock = ManualClock::starting_now();
        let mut config = AppConfig::default();
        config.rate_limit.window_seconds = 30;
        let state = AppState::from_config(config, clock.shared());

        state.limiter.allow("10.0.0.1").await;
        let maintenance = state.spawn_maintenance();

        clock.advance(TimeDelta::seconds(30));
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(state.limiter.tracked_keys().await, 0);

        maintenance.stop().await;
    }
}
