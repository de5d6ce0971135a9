//! Per-request access to server-side session state.
//!
//! A [`Session`] is a handle on a string-keyed bag of JSON values plus an
//! absolute deadline. The browser only ever holds an opaque, rotating token.
//! [`SessionManager::load`] resolves the token from the request cookie and
//! never fails: a missing, unknown, expired or undecodable token yields a
//! fresh empty session. Writes stay in memory until
//! [`SessionManager::commit`] flushes them, once, when the response is done.
//!
//! Fresh sessions are created lazily: no token is minted and no cookie is
//! sent until something is written.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use cookie::{Cookie, SameSite};
use parking_lot::Mutex;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::store::SessionStore;

/// One-shot status message shown on the next rendered page.
pub const FLASH: &str = "flash";
/// Id of the logged-in user; absent or `0` means nobody.
pub const AUTHENTICATED_USER_ID: &str = "authenticatedUserId";
/// Where to send the user after a successful login.
pub const REDIRECT_PATH_AFTER_LOGIN: &str = "redirectPathAfterLogin";

/// Random bytes behind every token; encodes to 43 URL-safe characters.
const TOKEN_BYTES: usize = 32;

/// Cookie and lifetime settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Absolute lifetime from creation.
    pub lifetime: chrono::Duration,
    /// Inactivity window; `None` keeps only the absolute lifetime.
    pub idle_timeout: Option<chrono::Duration>,
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session".to_owned(),
            lifetime: chrono::Duration::hours(12),
            idle_timeout: None,
            secure: true,
        }
    }
}

/// 32 bytes from the OS RNG, base64 URL-safe without padding.
pub(crate) fn generate_token() -> Result<String, Error> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

// ── Session handle ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionStatus {
    Unmodified,
    Modified,
    Destroyed,
}

/// What the store holds for a token.
#[derive(Deserialize, Serialize)]
struct Record {
    deadline: DateTime<Utc>,
    values: HashMap<String, Value>,
}

struct State {
    token: Option<String>,
    record: Record,
    status: SessionStatus,
    /// Tokens replaced by [`Session::renew_token`], deleted at commit.
    retired: Vec<String>,
}

/// Handle on the current request's session.
///
/// Cloning shares the same state: the session layer keeps one clone to flush
/// while the request carries the other down the chain.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<State>>,
}

impl Session {
    fn new(token: Option<String>, record: Record) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                token,
                record,
                status: SessionStatus::Unmodified,
                retired: Vec::new(),
            })),
        }
    }

    /// The current token; `None` until a fresh session is first written.
    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().record.values.contains_key(key)
    }

    /// Typed read; `None` when absent or of another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.state.lock().record.values.get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    /// Integer value, `0` when absent.
    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key).unwrap_or(0)
    }

    /// String value, empty when absent.
    pub fn get_string(&self, key: &str) -> String {
        self.get(key).unwrap_or_default()
    }

    pub fn put(&self, key: &str, value: impl Into<Value>) {
        let mut state = self.state.lock();
        state.record.values.insert(key.to_owned(), value.into());
        state.status = SessionStatus::Modified;
    }

    pub fn remove(&self, key: &str) {
        let mut state = self.state.lock();
        if state.record.values.remove(key).is_some() {
            state.status = SessionStatus::Modified;
        }
    }

    /// Returns the string under `key` and deletes it; empty when absent.
    pub fn pop_string(&self, key: &str) -> String {
        let mut state = self.state.lock();
        match state.record.values.remove(key) {
            Some(value) => {
                state.status = SessionStatus::Modified;
                match value {
                    Value::String(s) => s,
                    _ => String::new(),
                }
            }
            None => String::new(),
        }
    }

    /// Swaps in a new token while keeping every value. Call after any change
    /// of privilege (login, logout, password change) so a token planted
    /// before the change is worthless after it.
    pub fn renew_token(&self) -> Result<(), Error> {
        let fresh = generate_token()?;
        let mut state = self.state.lock();
        if let Some(old) = state.token.replace(fresh) {
            state.retired.push(old);
        }
        state.status = SessionStatus::Modified;
        Ok(())
    }

    /// Drops all values; the stored record is deleted at commit.
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        state.record.values.clear();
        state.status = SessionStatus::Destroyed;
    }
}

// ── Manager ───────────────────────────────────────────────────────────────────

/// Loads sessions from and flushes them to the durable store.
pub struct SessionManager<S> {
    store: S,
    config: SessionConfig,
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn fresh(&self) -> Session {
        Session::new(None, Record {
            deadline: Utc::now() + self.config.lifetime,
            values: HashMap::new(),
        })
    }

    /// Resolves the cookie token into a session. Fails open.
    pub async fn load(&self, token: Option<&str>) -> Session {
        let Some(token) = token else {
            return self.fresh();
        };
        let blob = match self.store.load(token).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return self.fresh(),
            Err(e) => {
                warn!(error = %e, "session store load failed, starting fresh session");
                return self.fresh();
            }
        };
        match serde_json::from_slice::<Record>(&blob) {
            Ok(record) if record.deadline > Utc::now() => Session::new(Some(token.to_owned()), record),
            Ok(_) => self.fresh(),
            Err(e) => {
                debug!(error = %e, "undecodable session record, starting fresh session");
                self.fresh()
            }
        }
    }

    /// When the stored record and the cookie should lapse.
    fn expiry(&self, deadline: DateTime<Utc>) -> DateTime<Utc> {
        match self.config.idle_timeout {
            Some(idle) => deadline.min(Utc::now() + idle),
            None => deadline,
        }
    }

    /// Flushes the session and returns the cookie to send, if any.
    pub async fn commit(&self, session: &Session) -> Result<Option<Cookie<'static>>, Error> {
        let (status, token, blob, deadline, retired) = {
            let mut state = session.state.lock();
            if state.status == SessionStatus::Modified && state.token.is_none() {
                state.token = Some(generate_token()?);
            }
            let retired = std::mem::take(&mut state.retired);
            let blob = serde_json::to_vec(&state.record)?;
            (state.status, state.token.clone(), blob, state.record.deadline, retired)
        };

        for old in &retired {
            self.store.delete(old).await?;
        }

        match (status, token) {
            (SessionStatus::Destroyed, token) => {
                if let Some(token) = token {
                    self.store.delete(&token).await?;
                }
                Ok(Some(self.removal_cookie()))
            }
            (SessionStatus::Modified, Some(token)) => {
                let expiry = self.expiry(deadline);
                self.store.save(&token, blob, expiry).await?;
                Ok(Some(self.cookie(token, expiry)))
            }
            (SessionStatus::Unmodified, Some(token)) if self.config.idle_timeout.is_some() => {
                let expiry = self.expiry(deadline);
                self.store.save(&token, blob, expiry).await?;
                Ok(Some(self.cookie(token, expiry)))
            }
            _ => Ok(None),
        }
    }

    fn cookie(&self, token: String, expiry: DateTime<Utc>) -> Cookie<'static> {
        let max_age = (expiry - Utc::now()).num_seconds().max(0);
        let mut cookie = Cookie::build((self.config.cookie_name.clone(), token))
            .http_only(true)
            .secure(self.config.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(max_age))
            .build();
        if let Ok(at) = time::OffsetDateTime::from_unix_timestamp(expiry.timestamp()) {
            cookie.set_expires(at);
        }
        cookie
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), ""))
            .http_only(true)
            .secure(self.config.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::ZERO)
            .expires(time::OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}
