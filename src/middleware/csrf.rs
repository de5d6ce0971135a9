//! Cross-site request forgery guard.
//!
//! A random secret lives in its own `HttpOnly` cookie. Pages embed the same
//! value in a hidden `csrf_token` field; an unsafe request must echo it back,
//! in the form or the `X-CSRF-Token` header, or it is rejected with 400
//! before the handler runs. The secret outlives session renewal, so a form
//! rendered before login still submits after it.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cookie::Cookie;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::app::App;
use crate::middleware::Next;
use crate::request::Request;
use crate::response::Response;
use crate::session::generate_token;
use crate::status::Status;
use crate::store::Backend;

/// Hidden form field carrying the token.
pub const CSRF_FIELD: &str = "csrf_token";
/// Header alternative for non-form clients.
pub const CSRF_HEADER: &str = "x-csrf-token";

const SECRET_BYTES: usize = 32;

#[derive(Clone, Debug)]
pub struct CsrfConfig {
    pub cookie_name: String,
    pub secure: bool,
    pub max_age: time::Duration,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: "csrf_token".to_owned(),
            secure: true,
            max_age: time::Duration::days(365),
        }
    }
}

impl CsrfConfig {
    fn cookie(&self, secret: &str) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), secret.to_owned()))
            .http_only(true)
            .secure(self.secure)
            .path("/")
            .max_age(self.max_age)
            .build()
    }
}

/// Accepts only what [`generate_token`] produces.
fn well_formed(secret: &str) -> bool {
    URL_SAFE_NO_PAD
        .decode(secret)
        .is_ok_and(|bytes| bytes.len() == SECRET_BYTES)
}

fn verify(secret: &str, sent: &str) -> bool {
    secret.as_bytes().ct_eq(sent.as_bytes()).into()
}

/// Issues the token on every request and checks it on unsafe ones.
pub async fn csrf_guard<B: Backend>(app: Arc<App<B>>, mut req: Request, next: Next<B>) -> Response {
    let method = req.method();
    let uri = req.uri().to_owned();

    let (secret, fresh) = match req.cookie(&app.csrf.cookie_name).filter(|s| well_formed(s)) {
        Some(secret) => (secret, false),
        None => match generate_token() {
            Ok(secret) => (secret, true),
            Err(e) => return app.server_error(method, &uri, &e),
        },
    };

    let passed = method.is_safe() || {
        let sent = req.header(CSRF_HEADER)
            .map(str::to_owned)
            .or_else(|| req.form_value(CSRF_FIELD));
        // A secret minted on this request cannot have been rendered into a form.
        !fresh && sent.is_some_and(|sent| verify(&secret, &sent))
    };

    let mut res = if passed {
        req.context.csrf_token = Some(secret.clone());
        next.run(Arc::clone(&app), req).await
    } else {
        warn!(%method, uri, ip = %req.remote_addr().ip(), "csrf token missing or invalid");
        app.client_error(Status::BadRequest)
    };

    res.add_vary("Cookie");
    if fresh {
        res.append_header("set-cookie", &app.csrf.cookie(&secret).to_string());
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::handler::ErasedHandler;
    use crate::middleware::Stack;
    use crate::testing::{request, test_app};
    use crate::{Error, Method};

    static GUARDED_CALLS: AtomicUsize = AtomicUsize::new(0);

    async fn echo_token<B: Backend>(_app: Arc<App<B>>, req: Request) -> Result<String, Error> {
        Ok(req.csrf_token().to_owned())
    }

    async fn guarded<B: Backend>(_app: Arc<App<B>>, _req: Request) -> Result<&'static str, Error> {
        GUARDED_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok("inserted")
    }

    fn form_post(body: &str, cookie: Option<&str>) -> Request {
        let mut req = request(Method::Post, "/snippet/create");
        req.headers.push(("content-type".into(), "application/x-www-form-urlencoded".into()));
        if let Some(cookie) = cookie {
            req.headers.push(("cookie".into(), cookie.to_owned()));
        }
        req.body = body.to_owned().into();
        req
    }

    #[tokio::test]
    async fn issues_a_token_and_accepts_it_back() {
        let app = test_app();
        let chain = Stack::new().with(csrf_guard).wrap(echo_token);

        let res = chain.call(Arc::clone(&app), request(Method::Get, "/")).await;
        let token = String::from_utf8(res.body().to_vec()).unwrap();
        assert_eq!(token.len(), 43);
        let set_cookie = res.header("set-cookie").unwrap();
        assert!(set_cookie.starts_with(&format!("csrf_token={token}")));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Path=/"));
        assert_eq!(res.header("vary"), Some("Cookie"));

        let cookie = format!("csrf_token={token}");
        let res = chain.call(Arc::clone(&app), form_post(&format!("csrf_token={token}"), Some(&cookie))).await;
        assert_eq!(res.status_code(), Status::Ok);
        assert!(res.header("set-cookie").is_none());

        let mut req = form_post("", Some(&cookie));
        req.headers.push(("X-CSRF-Token".into(), token));
        let res = chain.call(app, req).await;
        assert_eq!(res.status_code(), Status::Ok);
    }

    #[tokio::test]
    async fn rejects_before_the_handler_runs() {
        let app = test_app();
        let issue = Stack::new().with(csrf_guard).wrap(echo_token);
        let res = issue.call(Arc::clone(&app), request(Method::Get, "/")).await;
        let token = String::from_utf8(res.body().to_vec()).unwrap();
        let cookie = format!("csrf_token={token}");

        let chain = Stack::new().with(csrf_guard).wrap(guarded);
        let rejected = [
            form_post("title=x", Some(&cookie)),
            form_post("csrf_token=wrong", Some(&cookie)),
            form_post(&format!("csrf_token={token}"), None),
        ];
        for req in rejected {
            let res = chain.call(Arc::clone(&app), req).await;
            assert_eq!(res.status_code(), Status::BadRequest);
            assert_eq!(res.body(), b"Bad Request");
        }
        assert_eq!(GUARDED_CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn only_generated_secrets_are_well_formed() {
        assert!(well_formed(&generate_token().unwrap()));
        assert!(!well_formed("short"));
        assert!(!well_formed("!!!not base64!!!"));
    }
}
