// ============================
// authgate-backend/src/auth/blacklist.rs
// ============================
//! Revocation set for tokens invalidated before their natural expiry.
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::metrics::{BLACKLIST_SIZE, TOKENS_REVOKED};

/// Expired entries are swept opportunistically every this many inserts
const PRUNE_EVERY: u64 = 256;

/// Process-wide set of revoked token strings.
///
/// Each entry lives until the token would have expired anyway; past that
/// point the token already fails validation, so the entry can be dropped.
#[derive(Debug, Clone, Default)]
pub struct TokenBlacklist {
    entries: Arc<DashMap<String, DateTime<Utc>>>,
    inserts: Arc<AtomicU64>,
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `token` as revoked until `expires_at`. Revoking twice only
    /// overwrites the stored expiry. `now` drives the opportunistic prune.
    pub fn revoke(&self, token: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.entries.insert(token.to_string(), expires_at);
        counter!(TOKENS_REVOKED).increment(1);

        let n = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if n % PRUNE_EVERY == 0 {
            self.prune_expired(now);
        }
        gauge!(BLACKLIST_SIZE).set(self.entries.len() as f64);
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Drop entries whose token has passed its natural expiry
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            tracing::debug!(removed, "pruned expired blacklist entries");
            gauge!(BLACKLIST_SIZE).set(self.entries.len() as f64);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
