// ==============
// authgate-backend/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCEEDED: &str = "auth.login.succeeded";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const USER_REGISTERED: &str = "auth.user.registered";
pub const TOKENS_ISSUED: &str = "auth.tokens.issued";
pub const TOKENS_REVOKED: &str = "auth.tokens.revoked";
pub const BLACKLIST_SIZE: &str = "auth.blacklist.size";
pub const RATE_LIMITED: &str = "auth.rate_limit.rejected";
pub const RATE_BUCKETS: &str = "auth.rate_limit.buckets";
pub const OTP_ISSUED: &str = "auth.otp.issued";
pub const OTP_CONSUMED: &str = "auth.otp.consumed";
