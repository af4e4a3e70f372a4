use std::env;
use std::time::Duration;

/// How often revoked tokens past their natural expiry are purged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevocationConfig {
    pub sweep_interval_seconds: u64,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: 300,
        }
    }
}

impl RevocationConfig {
    pub fn from_env() -> Self {
        Self {
            sweep_interval_seconds: env::var("REVOCATION_SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}
