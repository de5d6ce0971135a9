//! In-memory collaborators for single-process deployments and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{Backend, SessionStore, SnippetStore, StoreError, UserStore};
use crate::models::{Snippet, User};

/// Wires the three in-memory stores together.
pub struct MemoryBackend;

impl Backend for MemoryBackend {
    type Snippets = MemorySnippetStore;
    type Users = MemoryUserStore;
    type Sessions = MemorySessionStore;
}

// ── Snippets ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemorySnippetStore {
    snippets: RwLock<BTreeMap<i64, Snippet>>,
    last_id: AtomicI64,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnippetStore for MemorySnippetStore {
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> Result<i64, StoreError> {
        let created = Utc::now();
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.snippets.write().insert(id, Snippet {
            id,
            title: title.to_owned(),
            content: content.to_owned(),
            created,
            expires: created + chrono::Duration::days(expires_days),
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Snippet, StoreError> {
        let now = Utc::now();
        self.snippets.read()
            .get(&id)
            .filter(|s| s.expires > now)
            .cloned()
            .ok_or(StoreError::NoRecord)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        let now = Utc::now();
        Ok(self.snippets.read()
            .values()
            .rev()
            .filter(|s| s.expires > now)
            .take(10)
            .cloned()
            .collect())
    }
}

// ── Users ─────────────────────────────────────────────────────────────────────

struct Account {
    user: User,
    password_hash: String,
}

#[derive(Default)]
pub struct MemoryUserStore {
    accounts: RwLock<BTreeMap<i64, Account>>,
    /// Ids are never reused, so a session naming a deleted account can't
    /// resolve to a later one.
    last_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deletes an account. Sessions that still reference it stop
    /// authenticating on their next request.
    pub fn remove(&self, id: i64) -> bool {
        self.accounts.write().remove(&id).is_some()
    }
}

/// Argon2id with a random salt, PHC string format. Runs on the blocking
/// pool; a hash costs tens of milliseconds of CPU.
async fn hash_password(password: &str) -> Result<String, StoreError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::Backend(format!("failed to hash password: {e}")))
    })
    .await
    .map_err(|e| StoreError::Backend(format!("password hashing task failed: {e}")))?
}

async fn verify_password(password: &str, hash: String) -> Result<bool, StoreError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| StoreError::Backend(format!("invalid password hash: {e}")))?;
        Ok::<_, StoreError>(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| StoreError::Backend(format!("password verification task failed: {e}")))?
}

impl UserStore for MemoryUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<i64, StoreError> {
        let password_hash = hash_password(password).await?;
        let mut accounts = self.accounts.write();
        if accounts.values().any(|a| a.user.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        accounts.insert(id, Account {
            user: User {
                id,
                name: name.to_owned(),
                email: email.to_owned(),
                created: Utc::now(),
            },
            password_hash,
        });
        Ok(id)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, StoreError> {
        let (id, hash) = self.accounts.read()
            .values()
            .find(|a| a.user.email == email)
            .map(|a| (a.user.id, a.password_hash.clone()))
            .ok_or(StoreError::InvalidCredentials)?;
        if verify_password(password, hash).await? {
            Ok(id)
        } else {
            Err(StoreError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.accounts.read().contains_key(&id))
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        self.accounts.read()
            .get(&id)
            .map(|a| a.user.clone())
            .ok_or(StoreError::NoRecord)
    }

    async fn password_update(&self, id: i64, current: &str, new: &str) -> Result<(), StoreError> {
        let hash = self.accounts.read()
            .get(&id)
            .map(|a| a.password_hash.clone())
            .ok_or(StoreError::NoRecord)?;
        if !verify_password(current, hash).await? {
            return Err(StoreError::InvalidCredentials);
        }
        let replacement = hash_password(new).await?;
        match self.accounts.write().get_mut(&id) {
            Some(account) => {
                account.password_hash = replacement;
                Ok(())
            }
            None => Err(StoreError::NoRecord),
        }
    }
}

// ── Sessions ──────────────────────────────────────────────────────────────────

struct Entry {
    data: Vec<u8>,
    expiry: DateTime<Utc>,
}

/// Cheap to clone; clones share the same entries.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry; returns how many went.
    pub fn cleanup(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expiry > now);
        before - entries.len()
    }

    /// Runs [`cleanup`](Self::cleanup) every `every` until the runtime stops.
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = store.cleanup();
                if removed > 0 {
                    debug!(removed, "expired sessions swept");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Utc::now();
        Ok(self.entries.read()
            .get(token)
            .filter(|e| e.expiry > now)
            .map(|e| e.data.clone()))
    }

    async fn save(&self, token: &str, data: Vec<u8>, expiry: DateTime<Utc>) -> Result<(), StoreError> {
        self.entries.write().insert(token.to_owned(), Entry { data, expiry });
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        self.entries.write().remove(token);
        Ok(())
    }
}
