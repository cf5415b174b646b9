// ============================
// authgate-backend/src/auth/password.rs
// ============================
//! Password strength policy and hashing.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Minimum password length accepted by the default policy
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Plaintext hashed once to produce the decoy used by [`PasswordPolicy::verify_dummy`]
const DECOY_SECRET: &str = "authgate-decoy-Secret-0";

/// Errors raised by the password policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error(
        "password must be at least {0} characters long and contain an uppercase letter, a lowercase letter and a digit"
    )]
    WeakPassword(usize),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// PHC-formatted one-way hash of a password
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct HashedSecret(String);

impl HashedSecret {
    /// Wrap a PHC string loaded from storage
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedSecret(..)")
    }
}

/// Password complexity rules plus the hash function they guard
pub struct PasswordPolicy {
    min_length: usize,
    hasher: Argon2<'static>,
    decoy: OnceLock<Option<HashedSecret>>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(MIN_PASSWORD_LENGTH)
    }
}

impl PasswordPolicy {
    /// Argon2id with the crate's recommended cost parameters. The cost is fixed
    /// for the lifetime of the policy.
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::DEFAULT),
            decoy: OnceLock::new(),
        }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Check a password against the complexity requirements
    pub fn validate(&self, password: &str) -> Result<(), PolicyError> {
        let long_enough = password.chars().count() >= self.min_length;
        let has_upper = password.chars().any(char::is_uppercase);
        let has_lower = password.chars().any(char::is_lowercase);
        let has_digit = password.chars().any(char::is_numeric);

        if long_enough && has_upper && has_lower && has_digit {
            Ok(())
        } else {
            Err(PolicyError::WeakPassword(self.min_length))
        }
    }

    /// Hash a password with a freshly generated salt
    pub fn hash(&self, password: &str) -> Result<HashedSecret, PolicyError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PolicyError::Hashing(e.to_string()))?;
        Ok(HashedSecret(hash.to_string()))
    }

    /// Verify a password against a stored hash. Malformed hashes never match.
    pub fn verify(&self, secret: &str, hash: &HashedSecret) -> bool {
        let parsed = match PasswordHash::new(hash.as_str()) {
            Ok(h) => h,
            Err(_) => return false,
        };
        self.hasher.verify_password(secret.as_bytes(), &parsed).is_ok()
    }

    /// Spend one verification against a decoy hash and report no match.
    /// Keeps the cost of a lookup miss in line with a wrong password.
    pub fn verify_dummy(&self, secret: &str) -> bool {
        let decoy = self.decoy.get_or_init(|| self.hash(DECOY_SECRET).ok());
        if let Some(decoy) = decoy {
            let _ = self.verify(secret, decoy);
        }
        false
    }
}
