// ============================
// authgate-backend/src/storage.rs
// ============================
//! User store abstraction with in-memory and flat-file implementations.
use async_trait::async_trait;
use authgate_common::{UserId, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::{fs as tokio_fs, sync::RwLock};

use crate::auth::HashedSecret;

/// Which unique column a write collided on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Email,
    Username,
}

/// Errors raised by a user store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate {0:?}")]
    Duplicate(DuplicateField),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A stored user, including the password hash
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: HashedSecret,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public view without the hash
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            full_name: self.full_name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields of a user about to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: HashedSecret,
}

/// Sparse update: only `Some` fields are applied
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub id: UserId,
    pub username: Option<String>,
    pub password_hash: Option<HashedSecret>,
}

/// Pending password-reset code for one email
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Trait for user store backends
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; fails with `Duplicate` if email or username is taken
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_by_id(&self, id: UserId) -> Result<User, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// First user matching either identifier, preferring an email match
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<User, StoreError>;

    async fn update(&self, update: ProfileUpdate) -> Result<(), StoreError>;

    /// Insert or overwrite the reset code for `email`
    async fn save_otp(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn find_otp(&self, email: &str) -> Result<OtpRecord, StoreError>;

    /// Remove the reset code for `email`; absent records are not an error
    async fn delete_otp(&self, email: &str) -> Result<(), StoreError>;
}

/// Table state shared by both backends
#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    otps: HashMap<String, OtpRecord>,
    next_id: UserId,
}

impl Tables {
    fn from_rows(users: Vec<User>, otps: Vec<OtpRecord>) -> Self {
        let next_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        Self {
            users: users.into_iter().map(|u| (u.id, u)).collect(),
            otps: otps.into_iter().map(|r| (r.email.clone(), r)).collect(),
            next_id,
        }
    }

    fn create(&mut self, new: NewUser) -> Result<User, StoreError> {
        if self.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate(DuplicateField::Email));
        }
        if self.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Duplicate(DuplicateField::Username));
        }

        let id = self.next_id.max(1);
        self.next_id = id + 1;
        let now = Utc::now();
        let user = User {
            id,
            full_name: new.full_name,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn find(&self, email: &str, username: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.email == email)
            .or_else(|| self.users.values().find(|u| u.username == username))
    }

    fn update(&mut self, update: ProfileUpdate) -> Result<(), StoreError> {
        if let Some(username) = &update.username {
            if self
                .users
                .values()
                .any(|u| u.id != update.id && &u.username == username)
            {
                return Err(StoreError::Duplicate(DuplicateField::Username));
            }
        }

        let user = self.users.get_mut(&update.id).ok_or(StoreError::NotFound)?;
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(())
    }

    fn save_otp(&mut self, email: &str, code: &str, expires_at: DateTime<Utc>) {
        self.otps.insert(
            email.to_string(),
            OtpRecord {
                email: email.to_string(),
                code: code.to_string(),
                expires_at,
            },
        );
    }
}

/// Volatile store, used when no data directory is configured and in tests
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.tables.write().await.create(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<User, StoreError> {
        self.tables
            .read()
            .await
            .find(email, username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, update: ProfileUpdate) -> Result<(), StoreError> {
        self.tables.write().await.update(update)
    }

    async fn save_otp(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tables.write().await.save_otp(email, code, expires_at);
        Ok(())
    }

    async fn find_otp(&self, email: &str) -> Result<OtpRecord, StoreError> {
        self.tables
            .read()
            .await
            .otps
            .get(email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_otp(&self, email: &str) -> Result<(), StoreError> {
        self.tables.write().await.otps.remove(email);
        Ok(())
    }
}

const USERS_FILE: &str = "users.json";
const RESETS_FILE: &str = "password-resets.json";

/// Flat-file store: tables live in memory and every write rewrites the
/// affected JSON file under `root`.
#[derive(Clone)]
pub struct FlatFileUserStore {
    root: PathBuf,
    tables: Arc<RwLock<Tables>>,
}

impl FlatFileUserStore {
    /// Open (or initialise) a store rooted at `root`
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        tokio_fs::create_dir_all(&root).await?;

        let users: Vec<User> = read_json(&root.join(USERS_FILE)).await?;
        let otps: Vec<OtpRecord> = read_json(&root.join(RESETS_FILE)).await?;
        tracing::info!(path = %root.display(), users = users.len(), "opened flat-file user store");

        Ok(Self {
            root,
            tables: Arc::new(RwLock::new(Tables::from_rows(users, otps))),
        })
    }

    async fn persist_users(&self, tables: &Tables) -> Result<(), StoreError> {
        let rows: Vec<&User> = tables.users.values().collect();
        write_json(&self.root.join(USERS_FILE), &rows).await
    }

    async fn persist_otps(&self, tables: &Tables) -> Result<(), StoreError> {
        let rows: Vec<&OtpRecord> = tables.otps.values().collect();
        write_json(&self.root.join(RESETS_FILE), &rows).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    if !tokio_fs::try_exists(path).await? {
        return Ok(T::default());
    }
    let content = tokio_fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Write to a sibling temp file and rename over the target
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio_fs::write(&tmp, json).await?;
    tokio_fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl UserStore for FlatFileUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        let created = tables.create(user)?;
        if let Err(e) = self.persist_users(&tables).await {
            tables.users.remove(&created.id);
            tables.next_id = created.id;
            return Err(e);
        }
        Ok(created)
    }

    async fn get_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<User, StoreError> {
        self.tables
            .read()
            .await
            .find(email, username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, update: ProfileUpdate) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let previous = tables
            .users
            .get(&update.id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        tables.update(update)?;
        if let Err(e) = self.persist_users(&tables).await {
            tables.users.insert(previous.id, previous);
            return Err(e);
        }
        Ok(())
    }

    async fn save_otp(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let previous = tables.otps.get(email).cloned();
        tables.save_otp(email, code, expires_at);
        if let Err(e) = self.persist_otps(&tables).await {
            match previous {
                Some(record) => tables.otps.insert(email.to_string(), record),
                None => tables.otps.remove(email),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn find_otp(&self, email: &str) -> Result<OtpRecord, StoreError> {
        self.tables
            .read()
            .await
            .otps
            .get(email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_otp(&self, email: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(removed) = tables.otps.remove(email) {
            if let Err(e) = self.persist_otps(&tables).await {
                tables.otps.insert(email.to_string(), removed);
                return Err(e);
            }
        }
        Ok(())
    }
}
