//! Process-wide store of revoked tokens.
//!
//! A token lands here when its holder logs out before the token's natural
//! expiry. Each entry remembers that expiry: once it passes, the codec would
//! reject the token anyway, so the entry is dead weight and the sweep drops
//! it. Without the sweep the store would grow for the life of the process.
//!
//! # Concurrency
//!
//! The map sits behind a [`tokio::sync::RwLock`]. Membership checks from
//! concurrent calls share the read lock; `revoke` and `sweep` take the write
//! lock only for the duration of a single insert or removal pass. The
//! background sweeper never holds a lock while waiting for its next tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use schoolrpc_core::{PeriodicTask, SharedClock};

/// Revoked-but-unexpired tokens, keyed by the raw token string.
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Clone, Debug)]
pub struct RevocationStore {
    entries: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    clock: SharedClock,
}

impl RevocationStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Marks `token` as revoked until `expires_at`.
    ///
    /// Revoking the same token twice overwrites the expiry, which is
    /// identical for the same token.
    pub async fn revoke(&self, token: impl Into<String>, expires_at: DateTime<Utc>) {
        let mut entries = self.entries.write().await;
        entries.insert(token.into(), expires_at);
        debug!(revoked = entries.len(), "token revoked");
    }

    pub async fn is_revoked(&self, token: &str) -> bool {
        self.entries.read().await.contains_key(token)
    }

    /// Removes every entry whose expiry has been reached and returns how
    /// many were removed.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Starts the background sweep, running every `interval` until the
    /// returned task is stopped or dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> PeriodicTask {
        let store = self.clone();
        PeriodicTask::spawn("revocation-sweep", interval, move || {
            let store = store.clone();
            async move {
                let removed = store.sweep().await;
                if removed > 0 {
                    info!(removed, "swept expired revoked tokens");
                }
            }
        })
    }
}
