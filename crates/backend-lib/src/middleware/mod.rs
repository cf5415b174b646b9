// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the `authgate` HTTP server.

pub mod auth;
pub mod rate_limit;

pub use auth::{require_auth, AuthenticatedUser};
pub use rate_limit::rate_limit;
