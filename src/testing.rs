//! Fixtures shared by the unit tests.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::app::App;
use crate::method::Method;
use crate::request::Request;
use crate::session::{SessionConfig, SessionManager};
use crate::store::{
    Backend, MemoryBackend, MemorySessionStore, MemorySnippetStore, MemoryUserStore, SessionStore,
    StoreError,
};
use crate::templates::TemplateCache;

pub(crate) fn templates() -> TemplateCache {
    TemplateCache::new(concat!(env!("CARGO_MANIFEST_DIR"), "/ui/html")).unwrap()
}

pub(crate) fn test_app() -> Arc<App<MemoryBackend>> {
    test_app_with(|app| app)
}

pub(crate) fn test_app_with(
    configure: impl FnOnce(App<MemoryBackend>) -> App<MemoryBackend>,
) -> Arc<App<MemoryBackend>> {
    let app = App::new(
        MemorySnippetStore::new(),
        MemoryUserStore::new(),
        SessionManager::new(MemorySessionStore::new(), SessionConfig::default()),
        templates(),
    );
    Arc::new(configure(app))
}

/// A bare request from a fixed peer, no headers, empty body.
pub(crate) fn request(method: Method, uri: &str) -> Request {
    Request::new(
        method,
        &uri.parse().unwrap(),
        http::Version::HTTP_11,
        "127.0.0.1:40000".parse().unwrap(),
        Vec::new(),
        Bytes::new(),
    )
}

/// A session store that is always down.
pub(crate) struct OfflineSessions;

impl SessionStore for OfflineSessions {
    async fn load(&self, _: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::Backend("offline".into()))
    }
    async fn save(&self, _: &str, _: Vec<u8>, _: DateTime<Utc>) -> Result<(), StoreError> {
        Err(StoreError::Backend("offline".into()))
    }
    async fn delete(&self, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("offline".into()))
    }
}

pub(crate) struct OfflineSessionsBackend;

impl Backend for OfflineSessionsBackend {
    type Snippets = MemorySnippetStore;
    type Users = MemoryUserStore;
    type Sessions = OfflineSessions;
}

pub(crate) fn offline_sessions_app() -> Arc<App<OfflineSessionsBackend>> {
    Arc::new(App::new(
        MemorySnippetStore::new(),
        MemoryUserStore::new(),
        SessionManager::new(OfflineSessions, SessionConfig::default()),
        templates(),
    ))
}
