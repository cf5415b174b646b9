// ============================
// authgate-backend/src/auth/token.rs
// ============================
//! Signed access and refresh tokens.
//!
//! Tokens are HS256 JWTs. Each kind is signed with its own secret so a leaked
//! refresh secret cannot mint access tokens and vice versa. Expiry is checked
//! against the caller supplied `now`, never the wall clock, and only after the
//! signature has been verified.
use authgate_common::UserId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::TOKENS_ISSUED;

/// Default lifetime of an access token (1 hour)
pub const ACCESS_TTL_SECS: u64 = 60 * 60;
/// Default lifetime of a refresh token (24 hours)
pub const REFRESH_TTL_SECS: u64 = 24 * 60 * 60;

/// Token validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// The two token families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified contents of a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub subject_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: AccessClaims,
}

/// On-the-wire claim set
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    sub: UserId,
    iat: i64,
    exp: i64,
    /// Random id so two tokens minted in the same second differ
    jti: String,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &str, ttl: std::time::Duration) -> anyhow::Result<Self> {
        let ttl_secs = i64::try_from(ttl.as_secs())?;
        if ttl_secs == 0 {
            anyhow::bail!("token ttl must be positive");
        }
        let ttl = Duration::try_seconds(ttl_secs)
            .ok_or_else(|| anyhow::anyhow!("token ttl of {ttl_secs}s is out of range"))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }
}

/// Secrets and lifetimes for both token kinds
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: std::time::Duration,
    pub refresh_ttl: std::time::Duration,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// Issues and validates tokens. Secrets are resolved once at construction.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> anyhow::Result<Self> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            anyhow::bail!("token secrets must not be empty");
        }
        if config.access_secret == config.refresh_secret {
            anyhow::bail!("access and refresh tokens must use different secrets");
        }

        // Expiry is enforced against the caller's clock below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            access: KeyPair::new(&config.access_secret, config.access_ttl)?,
            refresh: KeyPair::new(&config.refresh_secret, config.refresh_ttl)?,
            validation,
        })
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Lifetime of the given token kind
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    /// Sign a new token for `subject_id`, valid from `now` for the kind's ttl
    pub fn issue(
        &self,
        subject_id: UserId,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let keys = self.keys(kind);
        let iat = now.timestamp();
        let exp = iat
            .checked_add(keys.ttl.num_seconds())
            .ok_or_else(|| TokenError::Signing("expiry out of range".to_string()))?;

        let claims = JwtClaims {
            sub: subject_id,
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        counter!(TOKENS_ISSUED, "kind" => kind.as_str()).increment(1);

        Ok(IssuedToken {
            token,
            claims: to_access_claims(&claims).ok_or_else(|| {
                TokenError::Signing("timestamp out of range".to_string())
            })?,
        })
    }

    /// Verify signature then expiry. `expires_at <= now` is expired.
    pub fn validate(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<AccessClaims, TokenError> {
        let data = decode::<JwtClaims>(token, &self.keys(kind).decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })?;

        let claims = to_access_claims(&data.claims).ok_or(TokenError::Malformed)?;
        if claims.expires_at <= now {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new access token bound to the same subject.
    ///
    /// The refresh token itself is neither rotated nor revoked: it stays usable
    /// until its own expiry.
    pub fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = self.validate(refresh_token, TokenKind::Refresh, now)?;
        self.issue(claims.subject_id, TokenKind::Access, now)
    }
}

fn to_access_claims(claims: &JwtClaims) -> Option<AccessClaims> {
    Some(AccessClaims {
        subject_id: claims.sub,
        issued_at: DateTime::from_timestamp(claims.iat, 0)?,
        expires_at: DateTime::from_timestamp(claims.exp, 0)?,
    })
}
