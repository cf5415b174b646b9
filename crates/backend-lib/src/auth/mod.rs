// ============================
// authgate-backend/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod blacklist;
pub mod otp;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod token;

pub use blacklist::TokenBlacklist;
pub use otp::{LogDelivery, OtpCode, OtpDelivery, OtpError, OtpStore, OTP_TTL_SECS};
pub use password::{HashedSecret, PasswordPolicy, PolicyError, MIN_PASSWORD_LENGTH};
pub use rate_limit::RateLimiter;
pub use session::{AuthError, AuthSession, LoginOutcome};
pub use token::{
    AccessClaims, IssuedToken, TokenConfig, TokenError, TokenKind, TokenService, ACCESS_TTL_SECS,
    REFRESH_TTL_SECS,
};
