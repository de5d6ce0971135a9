//! Persistence capabilities consumed by the pipeline and its handlers.
//!
//! Each collaborator is a trait; [`Backend`] names one implementation of
//! each through associated types, so `App<B>` dispatches statically and a
//! test can swap any single store for a double.

mod memory;

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::models::{Snippet, User};

pub use memory::{MemoryBackend, MemorySessionStore, MemorySnippetStore, MemoryUserStore};

/// Failures reported by a persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no matching record found")]
    NoRecord,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("duplicate email")]
    DuplicateEmail,

    #[error("store backend: {0}")]
    Backend(String),
}

/// Snippet CRUD.
pub trait SnippetStore: Send + Sync + 'static {
    /// Stores a snippet that expires `expires_days` from now; returns its id.
    fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i64,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// [`StoreError::NoRecord`] when absent or expired.
    fn get(&self, id: i64) -> impl Future<Output = Result<Snippet, StoreError>> + Send;

    /// The ten newest unexpired snippets, newest first.
    fn latest(&self) -> impl Future<Output = Result<Vec<Snippet>, StoreError>> + Send;
}

/// User accounts and credentials.
pub trait UserStore: Send + Sync + 'static {
    /// [`StoreError::DuplicateEmail`] when the address is taken.
    fn insert(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Returns the user id; [`StoreError::InvalidCredentials`] on any mismatch.
    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Liveness check used by the authentication layer on every request.
    fn exists(&self, id: i64) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn get(&self, id: i64) -> impl Future<Output = Result<User, StoreError>> + Send;

    /// [`StoreError::InvalidCredentials`] when `current` is wrong.
    fn password_update(
        &self,
        id: i64,
        current: &str,
        new: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Durable key-value persistence of encoded session blobs.
pub trait SessionStore: Send + Sync + 'static {
    /// `Ok(None)` when the token is unknown or its expiry has passed.
    fn load(&self, token: &str) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Inserts or replaces the blob for `token`.
    fn save(
        &self,
        token: &str,
        data: Vec<u8>,
        expiry: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete(&self, token: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// One implementation of every collaborator.
pub trait Backend: Send + Sync + 'static {
    type Snippets: SnippetStore;
    type Users: UserStore;
    type Sessions: SessionStore;
}
