// ============================
// authgate-backend/src/auth/rate_limit.rs
// ============================
//! Per-client admission control using a token bucket.

use dashmap::DashMap;
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::{RATE_BUCKETS, RATE_LIMITED};

/// Default refill rate in tokens per second
pub const DEFAULT_REFILL_PER_SEC: f64 = 1.0;

/// Default burst capacity
pub const DEFAULT_BURST: u32 = 5;

/// Token bucket for a single client
#[derive(Debug, Clone)]
struct Bucket {
    /// Tokens currently available (fractional while refilling)
    tokens: f64,
    /// Last time the bucket was topped up
    last_refill: Instant,
}

impl Bucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant, rate: f64, capacity: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    fn try_take(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Rate limiter keyed by client identifier.
///
/// Buckets are created lazily on first sight of a client and refill
/// continuously at `refill_rate` tokens per second up to `capacity`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<String, Bucket>>,
    refill_rate: f64,
    capacity: f64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REFILL_PER_SEC, DEFAULT_BURST)
    }
}

impl RateLimiter {
    /// `refill_rate` must be positive and `capacity` at least 1.
    pub fn new(refill_rate: f64, capacity: u32) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            refill_rate,
            capacity: f64::from(capacity),
        }
    }

    /// Admit one call from `client_id` if its bucket holds a whole token
    pub fn allow(&self, client_id: &str, now: Instant) -> bool {
        let admitted = match self.buckets.get_mut(client_id) {
            Some(mut bucket) => self.take(&mut bucket, now),
            None => {
                // entry() holds the shard lock, so racing first callers share one bucket
                let mut bucket = self
                    .buckets
                    .entry(client_id.to_owned())
                    .or_insert_with(|| Bucket::full(self.capacity, now));
                self.take(&mut bucket, now)
            }
        };

        if !admitted {
            counter!(RATE_LIMITED).increment(1);
            tracing::debug!(client_id, "rate limit exceeded");
        }
        admitted
    }

    fn take(&self, bucket: &mut Bucket, now: Instant) -> bool {
        bucket.refill(now, self.refill_rate, self.capacity);
        bucket.try_take()
    }

    /// Time an idle bucket needs to refill completely
    pub fn refill_window(&self) -> Duration {
        Duration::from_secs_f64(self.capacity / self.refill_rate)
    }

    /// Drop buckets idle long enough to be full again. Such a bucket behaves
    /// exactly like a freshly created one, so admission is unaffected.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let window = self.refill_window();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < window);
        let removed = before.saturating_sub(self.buckets.len());

        if removed > 0 {
            tracing::debug!(removed, "evicted idle rate limit buckets");
        }
        gauge!(RATE_BUCKETS).set(self.buckets.len() as f64);
        removed
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
