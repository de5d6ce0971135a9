//! In-process test client: drives `Service::call` directly with a cookie jar,
//! never following redirects.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use cookie::Cookie;
use http_body_util::BodyExt;
use regex::Regex;

use snipbox::store::{MemoryBackend, MemorySessionStore, MemorySnippetStore, MemoryUserStore};
use snipbox::{routes, App, Service, SessionConfig, SessionManager, TemplateCache};

static CSRF_TOKEN_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input type="hidden" name="csrf_token" value="(.+?)">"#).unwrap()
});

pub const PASSWORD: &str = "pa$$word123";

pub struct TestResponse {
    pub status: u16,
    pub headers: http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers.get_all(name).iter().filter_map(|v| v.to_str().ok()).collect()
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}

pub struct TestClient {
    service: Service<MemoryBackend>,
    jar: BTreeMap<String, String>,
    peer: SocketAddr,
}

impl TestClient {
    pub fn new() -> Self {
        let templates = TemplateCache::new(concat!(env!("CARGO_MANIFEST_DIR"), "/ui/html")).unwrap();
        let app = App::<MemoryBackend>::new(
            MemorySnippetStore::new(),
            MemoryUserStore::new(),
            SessionManager::new(MemorySessionStore::new(), SessionConfig::default()),
            templates,
        );
        Self {
            service: Service::new(app, routes()),
            jar: BTreeMap::new(),
            peer: "127.0.0.1:50000".parse().unwrap(),
        }
    }

    pub fn app(&self) -> &Arc<App<MemoryBackend>> {
        self.service.app()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.jar.get(name).map(String::as_str)
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let req = http::Request::get(path).body(Bytes::new()).unwrap();
        self.send(req).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(fields).unwrap();
        let req = http::Request::post(path)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body))
            .unwrap();
        self.send(req).await
    }

    async fn send(&mut self, mut req: http::Request<Bytes>) -> TestResponse {
        if !self.jar.is_empty() {
            let cookies = self.jar.iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            req.headers_mut().insert("cookie", cookies.parse().unwrap());
        }

        let res = self.service.call(req, self.peer).await;
        let (parts, body) = res.into_parts();

        for value in parts.headers.get_all("set-cookie") {
            let cookie = Cookie::parse(value.to_str().unwrap().to_owned()).unwrap();
            if cookie.max_age().is_some_and(|age| age.is_zero()) {
                self.jar.remove(cookie.name());
            } else {
                self.jar.insert(cookie.name().to_owned(), cookie.value().to_owned());
            }
        }

        let body = body.collect().await.unwrap().to_bytes();
        TestResponse {
            status: parts.status.as_u16(),
            headers: parts.headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    /// Token from a GET of `path`, as a browser would have it rendered.
    pub async fn csrf_token_from(&mut self, path: &str) -> String {
        let res = self.get(path).await;
        extract_csrf_token(&res.body)
    }

    pub async fn signup(&mut self, name: &str, email: &str) -> TestResponse {
        let token = self.csrf_token_from("/user/signup").await;
        self.post_form("/user/signup", &[
            ("name", name),
            ("email", email),
            ("password", PASSWORD),
            ("csrf_token", &token),
        ])
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        let token = self.csrf_token_from("/user/login").await;
        self.post_form("/user/login", &[
            ("email", email),
            ("password", password),
            ("csrf_token", &token),
        ])
        .await
    }

    /// Signs up and logs in a fresh account; returns the login response.
    pub async fn signed_in(&mut self, email: &str) -> TestResponse {
        let res = self.signup("Alice", email).await;
        assert_eq!(res.status, 303, "signup failed: {}", res.body);
        let res = self.login(email, PASSWORD).await;
        assert_eq!(res.status, 303, "login failed: {}", res.body);
        res
    }
}

pub fn extract_csrf_token(body: &str) -> String {
    CSRF_TOKEN_RX
        .captures(body)
        .map(|c| c[1].to_owned())
        .expect("no csrf token found in body")
}
