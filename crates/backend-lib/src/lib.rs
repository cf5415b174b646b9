// ============================
// authgate-backend/src/lib.rs
// ============================
//! Core of the `authgate` server: session tokens, revocation, rate
//! limiting, password policy and the OTP password-reset flow, plus the thin
//! HTTP layer that exposes them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::{
    AuthSession, LogDelivery, OtpDelivery, OtpStore, PasswordPolicy, RateLimiter, TokenBlacklist,
    TokenService,
};
use crate::config::Settings;
use crate::storage::{FlatFileUserStore, MemoryUserStore, UserStore};

/// Application state shared across all handlers
pub struct AppState {
    /// Authentication use cases
    pub session: AuthSession,
    /// Per-client admission control
    pub rate_limiter: RateLimiter,
    /// Settings resolved at startup
    pub settings: Settings,
}

impl AppState {
    /// Wire the components together over an explicit store and delivery channel
    pub fn new(
        settings: Settings,
        store: Arc<dyn UserStore>,
        delivery: Arc<dyn OtpDelivery>,
    ) -> anyhow::Result<Self> {
        settings.validate()?;

        let tokens = TokenService::new(&settings.token_config())?;
        let session = AuthSession::new(
            store.clone(),
            PasswordPolicy::new(settings.password.min_length),
            tokens,
            TokenBlacklist::new(),
            OtpStore::new(store, settings.otp_ttl())?,
            delivery,
        );
        let rate_limiter =
            RateLimiter::new(settings.rate_limit.refill_per_sec, settings.rate_limit.burst);

        Ok(Self {
            session,
            rate_limiter,
            settings,
        })
    }

    /// Build state from settings alone: a flat-file store when a data
    /// directory is configured, otherwise an in-memory one
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match &settings.storage.data_dir {
            Some(dir) => Arc::new(FlatFileUserStore::open(dir).await?),
            None => {
                tracing::warn!("no storage.data_dir configured, users are kept in memory");
                Arc::new(MemoryUserStore::new())
            }
        };
        Self::new(settings, store, Arc::new(LogDelivery))
    }

    /// Run one pruning pass over the blacklist and the rate-limit buckets
    pub fn sweep(&self) -> (usize, usize) {
        let revoked = self.session.blacklist().prune_expired(chrono::Utc::now());
        let buckets = self.rate_limiter.evict_idle(Instant::now());
        (revoked, buckets)
    }

    /// Spawn the periodic sweep. Must be called from within a Tokio runtime.
    pub fn spawn_maintenance(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let (revoked, buckets) = state.sweep();
                tracing::debug!(revoked, buckets, "maintenance sweep finished");
            }
        })
    }
}
