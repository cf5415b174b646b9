// ============================
// authgate-backend/src/auth/session.rs
// ============================
//! Use-case orchestration: register, login, refresh, logout, profile
//! management and the password-reset flow.
use authgate_common::{
    LoginRequest, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest, UserId, UserProfile,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

use super::otp::{OtpDelivery, OtpError, OtpStore};
use super::password::{HashedSecret, PasswordPolicy, PolicyError};
use super::token::{AccessClaims, IssuedToken, TokenKind, TokenService};
use super::TokenBlacklist;
use crate::error::ErrorKind;
use crate::metrics::{LOGIN_FAILED, LOGIN_SUCCEEDED, USER_REGISTERED};
use crate::storage::{DuplicateField, NewUser, ProfileUpdate, StoreError, UserStore};

/// Failures of the authentication use cases
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    WeakPassword(String),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("username already taken")]
    DuplicateUsername,

    #[error("wrong email or password")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("user not found")]
    UserNotFound,

    #[error("no field to update")]
    NoFieldsToUpdate,

    #[error(transparent)]
    Otp(OtpError),

    #[error("storage error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::WeakPassword(_) => ErrorKind::Validation,
            AuthError::DuplicateEmail | AuthError::DuplicateUsername => ErrorKind::Conflict,
            AuthError::InvalidCredentials | AuthError::InvalidToken => ErrorKind::Authentication,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::NoFieldsToUpdate => ErrorKind::Policy,
            AuthError::Otp(OtpError::NotFound) => ErrorKind::NotFound,
            AuthError::Otp(OtpError::Mismatch | OtpError::Expired) => ErrorKind::Validation,
            AuthError::Otp(OtpError::Store(_)) | AuthError::Store(_) | AuthError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<PolicyError> for AuthError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::WeakPassword(_) => AuthError::WeakPassword(err.to_string()),
            PolicyError::Hashing(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::UserNotFound,
            StoreError::Duplicate(DuplicateField::Email) => AuthError::DuplicateEmail,
            StoreError::Duplicate(DuplicateField::Username) => AuthError::DuplicateUsername,
            other => AuthError::Store(other),
        }
    }
}

impl From<OtpError> for AuthError {
    fn from(err: OtpError) -> Self {
        AuthError::Otp(err)
    }
}

/// Tokens handed out by a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub profile: UserProfile,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Composes the password policy, token service, blacklist and reset codes
/// on top of a user store.
pub struct AuthSession {
    store: Arc<dyn UserStore>,
    policy: Arc<PasswordPolicy>,
    tokens: TokenService,
    blacklist: TokenBlacklist,
    otp: OtpStore,
    delivery: Arc<dyn OtpDelivery>,
}

impl AuthSession {
    pub fn new(
        store: Arc<dyn UserStore>,
        policy: PasswordPolicy,
        tokens: TokenService,
        blacklist: TokenBlacklist,
        otp: OtpStore,
        delivery: Arc<dyn OtpDelivery>,
    ) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
            tokens,
            blacklist,
            otp,
            delivery,
        }
    }

    pub fn blacklist(&self) -> &TokenBlacklist {
        &self.blacklist
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Validate, hash and persist a new user
    #[tracing::instrument(skip_all, fields(email = %input.email, username = %input.username))]
    pub async fn register(&self, input: RegisterRequest) -> Result<UserProfile, AuthError> {
        let password = Zeroizing::new(input.password);

        match self
            .store
            .find_by_email_or_username(&input.email, &input.username)
            .await
        {
            Ok(existing) if existing.email == input.email => return Err(AuthError::DuplicateEmail),
            Ok(existing) if existing.username == input.username => {
                return Err(AuthError::DuplicateUsername)
            }
            Ok(_) | Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        self.policy.validate(&password)?;
        let password_hash = self.hash(password).await?;

        let user = self
            .store
            .create(NewUser {
                full_name: input.full_name,
                username: input.username,
                email: input.email,
                password_hash,
            })
            .await?;

        counter!(USER_REGISTERED).increment(1);
        tracing::info!(user_id = user.id, "user registered");
        Ok(user.profile())
    }

    /// Check credentials and issue an access/refresh pair. Unknown email and
    /// wrong password fail identically.
    #[tracing::instrument(skip_all, fields(email = %input.email))]
    pub async fn login(
        &self,
        input: LoginRequest,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        let password = Zeroizing::new(input.password);

        let user = match self.store.get_by_email(&input.email).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let verified = match &user {
            Some(user) => self.verify(password, user.password_hash.clone()).await?,
            None => self.verify_dummy(password).await?,
        };
        let user = match user {
            Some(user) if verified => user,
            _ => {
                counter!(LOGIN_FAILED).increment(1);
                tracing::info!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let access = self.issue(user.id, TokenKind::Access, now)?;
        let refresh = self.issue(user.id, TokenKind::Refresh, now)?;

        counter!(LOGIN_SUCCEEDED).increment(1);
        tracing::info!(user_id = user.id, "login succeeded");
        Ok(LoginOutcome {
            profile: user.profile(),
            access,
            refresh,
        })
    }

    /// Mint a new access token from a refresh token. The refresh token is not
    /// rotated and stays valid until its own expiry.
    pub fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        self.tokens.refresh(refresh_token, now).map_err(|e| {
            tracing::debug!(error = %e, "refresh rejected");
            AuthError::InvalidToken
        })
    }

    /// Guard for protected calls: a valid, unrevoked access token
    pub fn authenticate(&self, access_token: &str, now: DateTime<Utc>) -> Result<AccessClaims, AuthError> {
        let claims = self
            .tokens
            .validate(access_token, TokenKind::Access, now)
            .map_err(|e| {
                tracing::debug!(error = %e, "access token rejected");
                AuthError::InvalidToken
            })?;

        if self.blacklist.is_revoked(access_token) {
            tracing::debug!(user_id = claims.subject_id, "revoked access token presented");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// Revoke an access token until it would have expired on its own
    pub fn logout(&self, access_token: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        let claims = self
            .tokens
            .validate(access_token, TokenKind::Access, now)
            .map_err(|_| AuthError::InvalidToken)?;

        self.blacklist.revoke(access_token, claims.expires_at, now);
        tracing::info!(user_id = claims.subject_id, "logged out");
        Ok(())
    }

    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile, AuthError> {
        Ok(self.store.get_by_id(user_id).await?.profile())
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        input: UpdateProfileRequest,
    ) -> Result<UserProfile, AuthError> {
        let password = input.password.map(Zeroizing::new);
        if input.username.is_none() && password.is_none() {
            return Err(AuthError::NoFieldsToUpdate);
        }

        let password_hash = match password {
            Some(password) => {
                self.policy.validate(&password)?;
                Some(self.hash(password).await?)
            }
            None => None,
        };

        self.store
            .update(ProfileUpdate {
                id: user_id,
                username: input.username,
                password_hash,
            })
            .await?;

        tracing::info!("profile updated");
        self.profile(user_id).await
    }

    /// Issue a reset code for a known email. An unknown email succeeds
    /// silently so the response does not reveal which emails exist.
    #[tracing::instrument(skip(self, now))]
    pub async fn forgot_password(&self, email: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        match self.store.get_by_email(email).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                tracing::debug!("reset requested for unknown email");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let code = self.otp.issue(email, now).await?;
        self.delivery.deliver(email, &code).await;
        Ok(())
    }

    /// Consume the reset code and replace the password
    #[tracing::instrument(skip_all, fields(email = %input.email))]
    pub async fn reset_password(
        &self,
        input: ResetPasswordRequest,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let new_password = Zeroizing::new(input.new_password);
        // checked before the code is spent so a weak choice can be retried
        self.policy.validate(&new_password)?;

        self.otp.consume(&input.email, &input.otp, now).await?;

        let user = self.store.get_by_email(&input.email).await?;
        let password_hash = self.hash(new_password).await?;
        self.store
            .update(ProfileUpdate {
                id: user.id,
                username: None,
                password_hash: Some(password_hash),
            })
            .await?;

        tracing::info!(user_id = user.id, "password reset");
        Ok(())
    }

    fn issue(&self, user_id: UserId, kind: TokenKind, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        self.tokens
            .issue(user_id, kind, now)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    // Argon2 is CPU bound; keep it off the async workers.
    async fn hash(&self, password: Zeroizing<String>) -> Result<HashedSecret, AuthError> {
        let policy = Arc::clone(&self.policy);
        tokio::task::spawn_blocking(move || policy.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(AuthError::from)
    }

    async fn verify(&self, password: Zeroizing<String>, hash: HashedSecret) -> Result<bool, AuthError> {
        let policy = Arc::clone(&self.policy);
        tokio::task::spawn_blocking(move || policy.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn verify_dummy(&self, password: Zeroizing<String>) -> Result<bool, AuthError> {
        let policy = Arc::clone(&self.policy);
        tokio::task::spawn_blocking(move || policy.verify_dummy(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))
    }
}
