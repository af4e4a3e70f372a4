use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if observability is enabled via OBSERVABILITY_ENABLED env var
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true) // Enabled by default
    })
}

/// Installs the Prometheus recorder and spawns its upkeep task.
///
/// Returns `Ok(None)` if observability is disabled. The host exposes
/// [`PrometheusHandle::render`] on whatever scrape endpoint it serves.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics() -> anyhow::Result<Option<PrometheusHandle>> {
    if !is_observability_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("rpc_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5,
                10.0,
            ],
        )
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Ok(Some(handle))
}

/// Records one finished unary call.
///
/// `code` is the status code name, e.g. `"Ok"` or `"Unauthenticated"`.
pub fn track_rpc_completed(method: &str, code: &str, duration_secs: f64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("rpc_requests_total", "method" => method.to_string(), "code" => code.to_string())
        .increment(1);
    histogram!("rpc_request_duration_seconds", "method" => method.to_string())
        .record(duration_secs);
}

pub fn track_rate_limited(scope: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("rpc_rate_limited_total", "scope" => scope.to_string()).increment(1);
}

/// Track authentication events
pub fn track_token_issued() {
    if !is_observability_enabled() {
        return;
    }
    counter!("auth_tokens_issued_total").increment(1);
}

/// `outcome` is one of `valid`, `missing`, `invalid`, `expired`, `revoked`.
pub fn track_token_validation(outcome: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("auth_token_validations_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn set_revoked_tokens(count: usize) {
    if !is_observability_enabled() {
        return;
    }
    gauge!("auth_revoked_tokens").set(count as f64);
}
