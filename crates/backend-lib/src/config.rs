// ============================
// authgate-backend/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are resolved once at startup: built-in defaults, then a TOML
//! file, then `AUTHGATE_*` environment variables (nested keys separated by
//! `__`, e.g. `AUTHGATE_TOKENS__ACCESS_SECRET`).
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{
    rate_limit::{DEFAULT_BURST, DEFAULT_REFILL_PER_SEC},
    TokenConfig, ACCESS_TTL_SECS, MIN_PASSWORD_LENGTH, OTP_TTL_SECS, REFRESH_TTL_SECS,
};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "authgate.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "AUTHGATE_";

/// Upper bound for every configured lifetime (one year)
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub tokens: TokenSettings,
    pub rate_limit: RateLimitSettings,
    pub otp: OtpSettings,
    pub password: PasswordSettings,
    pub storage: StorageSettings,
    pub maintenance: MaintenanceSettings,
    pub log: LogSettings,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Signing secrets and token lifetimes
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_ttl_secs: ACCESS_TTL_SECS,
            refresh_ttl_secs: REFRESH_TTL_SECS,
        }
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

/// Token bucket parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Tokens added per second
    pub refill_per_sec: f64,
    /// Bucket capacity
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            refill_per_sec: DEFAULT_REFILL_PER_SEC,
            burst: DEFAULT_BURST,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpSettings {
    pub ttl_secs: u64,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl_secs: OTP_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    pub min_length: usize,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
        }
    }
}

/// Where users are kept. No data directory means an in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: Option<PathBuf>,
}

/// Background pruning of the blacklist and idle rate-limit buckets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSettings {
    pub sweep_interval_secs: u64,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or `authgate.toml`) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tokens.access_secret.is_empty() || self.tokens.refresh_secret.is_empty() {
            bail!("tokens.access_secret and tokens.refresh_secret must be set");
        }
        if self.tokens.access_secret == self.tokens.refresh_secret {
            bail!("access and refresh tokens must use different secrets");
        }
        if self.tokens.access_ttl_secs == 0 || self.tokens.refresh_ttl_secs == 0 {
            bail!("token ttls must be positive");
        }
        if self.tokens.access_ttl_secs > MAX_TTL_SECS || self.tokens.refresh_ttl_secs > MAX_TTL_SECS {
            bail!("token ttls must not exceed {MAX_TTL_SECS} seconds");
        }
        if !(self.rate_limit.refill_per_sec.is_finite() && self.rate_limit.refill_per_sec > 0.0) {
            bail!("rate_limit.refill_per_sec must be positive");
        }
        if self.rate_limit.burst == 0 {
            bail!("rate_limit.burst must be at least 1");
        }
        if self.otp.ttl_secs == 0 || self.otp.ttl_secs > MAX_TTL_SECS {
            bail!("otp.ttl_secs must be between 1 and {MAX_TTL_SECS}");
        }
        if self.password.min_length < MIN_PASSWORD_LENGTH {
            bail!("password.min_length must be at least {MIN_PASSWORD_LENGTH}");
        }
        if self.maintenance.sweep_interval_secs == 0 {
            bail!("maintenance.sweep_interval_secs must be positive");
        }
        if !VALID_LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            bail!("log.level must be one of {VALID_LOG_LEVELS:?}");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            access_secret: self.tokens.access_secret.clone(),
            refresh_secret: self.tokens.refresh_secret.clone(),
            access_ttl: Duration::from_secs(self.tokens.access_ttl_secs),
            refresh_ttl: Duration::from_secs(self.tokens.refresh_ttl_secs),
        }
    }

    pub fn otp_ttl(&self) -> Duration {
        Duration::from_secs(self.otp.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance.sweep_interval_secs)
    }
}
