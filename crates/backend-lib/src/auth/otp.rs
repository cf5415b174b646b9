// ============================
// authgate-backend/src/auth/otp.rs
// ============================
//! One-time codes for the password-reset flow.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::metrics::{OTP_CONSUMED, OTP_ISSUED};
use crate::storage::{StoreError, UserStore};

/// Default validity window of a reset code (5 minutes)
pub const OTP_TTL_SECS: u64 = 5 * 60;

/// Reset-code failures
#[derive(Error, Debug)]
pub enum OtpError {
    #[error("no reset code issued for this email")]
    NotFound,

    #[error("reset code does not match")]
    Mismatch,

    #[error("reset code has expired")]
    Expired,

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for OtpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => OtpError::NotFound,
            other => OtpError::Store(other),
        }
    }
}

/// A six digit, zero padded code
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    fn random() -> Self {
        let n: u32 = rand::rng().random_range(0..1_000_000);
        Self(format!("{n:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

/// Out-of-band delivery of a reset code to its owner
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(&self, email: &str, code: &OtpCode);
}

/// Delivery stand-in that only emits a tracing event
#[derive(Debug, Default, Clone)]
pub struct LogDelivery;

#[async_trait]
impl OtpDelivery for LogDelivery {
    async fn deliver(&self, email: &str, code: &OtpCode) {
        tracing::info!(email, code = code.as_str(), "password reset code issued");
    }
}

/// Issues and checks reset codes, persisting them through the user store
#[derive(Clone)]
pub struct OtpStore {
    store: Arc<dyn UserStore>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(store: Arc<dyn UserStore>, ttl: std::time::Duration) -> anyhow::Result<Self> {
        let ttl = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(Duration::try_seconds)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| anyhow::anyhow!("otp ttl of {}s is out of range", ttl.as_secs()))?;
        Ok(Self { store, ttl })
    }

    /// Generate a code for `email`, replacing any earlier one
    pub async fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<OtpCode, OtpError> {
        let code = OtpCode::random();
        self.store
            .save_otp(email, code.as_str(), now + self.ttl)
            .await
            .map_err(OtpError::Store)?;

        counter!(OTP_ISSUED).increment(1);
        Ok(code)
    }

    /// Check `candidate` for `email`; the record is deleted on success so
    /// each code works once. A wrong code leaves the record in place.
    pub async fn consume(
        &self,
        email: &str,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        let record = self.store.find_otp(email).await?;

        if !codes_match(&record.code, candidate) {
            return Err(OtpError::Mismatch);
        }
        if now > record.expires_at {
            self.store.delete_otp(email).await.map_err(OtpError::Store)?;
            return Err(OtpError::Expired);
        }

        self.store.delete_otp(email).await.map_err(OtpError::Store)?;
        counter!(OTP_CONSUMED).increment(1);
        Ok(())
    }
}

/// Compare without exiting at the first differing byte
fn codes_match(stored: &str, candidate: &str) -> bool {
    let (a, b) = (stored.as_bytes(), candidate.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}
