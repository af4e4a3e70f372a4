//! Fixed-window call counters.
//!
//! [`RateLimiter`] keeps one window per key. Keys are spread across a fixed
//! number of independently locked shards so that callers with different
//! identities rarely wait on each other. The check and the increment for a
//! key happen under that key's shard lock, so two concurrent calls can never
//! both take the last slot in a window.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use schoolrpc_config::RateLimitConfig;
use schoolrpc_core::SharedClock;

const SHARD_COUNT: usize = 16;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

#[derive(Debug)]
struct Inner {
    shards: Vec<Mutex<HashMap<String, Window>>>,
    threshold: u32,
    window: TimeDelta,
    clock: SharedClock,
}

impl Inner {
    fn shard(&self, key: &str) -> &Mutex<HashMap<String, Window>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    fn has_ended(&self, window: &Window, now: DateTime<Utc>) -> bool {
        window
            .started_at
            .checked_add_signed(self.window)
            .is_some_and(|end| now >= end)
    }
}

/// Process-wide fixed-window rate limiter.
///
/// Cloning is cheap and every clone shares the same counters.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    /// Allows `threshold` calls per key in every `window`.
    pub fn new(threshold: u32, window: TimeDelta, clock: SharedClock) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| Mutex::new(HashMap::new()))
            .collect();

        Self {
            inner: Arc::new(Inner {
                shards,
                threshold,
                window,
                clock,
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig, clock: SharedClock) -> Self {
        let window = i64::try_from(config.window_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self::new(config.threshold, window, clock)
    }

    pub fn threshold(&self) -> u32 {
        self.inner.threshold
    }

    pub fn window(&self) -> TimeDelta {
        self.inner.window
    }

    /// Counts one call for `key` and reports whether it may proceed.
    ///
    /// Rejected calls are not counted.
    pub async fn allow(&self, key: &str) -> bool {
        let now = self.inner.clock.now();
        let mut shard = self.inner.shard(key).lock().await;

        if let Some(window) = shard.get_mut(key) {
            if !self.inner.has_ended(window, now) {
                if window.count >= self.inner.threshold {
                    return false;
                }
                window.count += 1;
                return true;
            }
        }

        if self.inner.threshold == 0 {
            return false;
        }
        shard.insert(
            key.to_string(),
            Window {
                started_at: now,
                count: 1,
            },
        );
        true
    }

    /// Drops every window that has ended and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut removed = 0;

        for shard in &self.inner.shards {
            let mut shard = shard.lock().await;
            let before = shard.len();
            shard.retain(|_, window| !self.inner.has_ended(window, now));
            removed += before - shard.len();
        }

        if removed > 0 {
            debug!(removed, "purged ended rate limit windows");
        }
        removed
    }

    /// Number of keys with a tracked window, ended or not.
    pub async fn tracked_keys(&self) -> usize {
        let mut total = 0;
        for shard in &self.inner.shards {
            total += shard.lock().await.len();
        }
        total
    }
}
