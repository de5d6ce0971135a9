//! Incoming HTTP request type.
//!
//! Besides the wire data, a [`Request`] carries the request-scoped context the
//! middleware chain fills in as it runs: the session handle, the CSRF token
//! for form embedding, and the authentication fact. Each is a typed field set
//! by exactly one layer; handlers only read them.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use cookie::Cookie;

use crate::error::Error;
use crate::method::Method;
use crate::session::Session;

/// An incoming HTTP request with a fully buffered body.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: String,
    pub(crate) path: String,
    pub(crate) version: http::Version,
    pub(crate) remote_addr: SocketAddr,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) context: Context,
}

/// Facts attached by the middleware chain. Never read from client input.
#[derive(Default)]
pub(crate) struct Context {
    pub(crate) session: Option<Session>,
    pub(crate) csrf_token: Option<String>,
    pub(crate) authenticated: bool,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        uri: &http::Uri,
        version: http::Version,
        remote_addr: SocketAddr,
        headers: Vec<(String, String)>,
        body: Bytes,
    ) -> Self {
        let path = uri.path().to_owned();
        let uri = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| path.clone());
        Self {
            method,
            uri,
            path,
            version,
            remote_addr,
            headers,
            body,
            params: HashMap::new(),
            context: Context::default(),
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn version(&self) -> http::Version { self.version }
    pub fn remote_addr(&self) -> SocketAddr { self.remote_addr }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Path plus query string, as sent by the client.
    pub fn uri(&self) -> &str { &self.uri }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/snippet/view/{id}`, `req.param("id")` on `/snippet/view/42`
    /// returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Value of the named cookie. HTTP/2 clients may split cookies across
    /// several `cookie` headers, so all of them are searched.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers.iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, v)| Cookie::split_parse(v.as_str()))
            .filter_map(Result::ok)
            .find(|c| c.name() == name)
            .map(|c| c.value().to_owned())
    }

    /// Looks up a field of an `application/x-www-form-urlencoded` body.
    pub fn form_value(&self, key: &str) -> Option<String> {
        let is_form = self.header("content-type")
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if !is_form {
            return None;
        }
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(&self.body)
            .ok()?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// The session loaded by the session layer.
    pub fn session(&self) -> Result<&Session, Error> {
        self.context.session.as_ref().ok_or(Error::NoSession)
    }

    /// The CSRF token to embed in forms; empty outside the CSRF layer.
    pub fn csrf_token(&self) -> &str {
        self.context.csrf_token.as_deref().unwrap_or_default()
    }

    /// Whether the authentication layer verified a live user for this request.
    pub fn is_authenticated(&self) -> bool {
        self.context.authenticated
    }
}
