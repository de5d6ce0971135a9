//! Security headers on every response.

use std::sync::Arc;

use crate::app::App;
use crate::middleware::Next;
use crate::request::Request;
use crate::response::Response;
use crate::store::Backend;

/// Fixed hardening headers. Values are constants, so applying them twice
/// changes nothing.
pub const SECURITY_HEADERS: [(&str, &str); 6] = [
    (
        "content-security-policy",
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
    ),
    ("referrer-policy", "origin-when-cross-origin"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "0"),
    ("server", "snipbox"),
];

pub async fn common_headers<B: Backend>(app: Arc<App<B>>, req: Request, next: Next<B>) -> Response {
    let mut res = next.run(app, req).await;
    harden(&mut res);
    res
}

/// Adds each hardening header the response does not already carry.
pub(crate) fn harden(res: &mut Response) {
    for (name, value) in SECURITY_HEADERS {
        res.set_default_header(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ErasedHandler;
    use crate::middleware::Stack;
    use crate::testing::{request, test_app};
    use crate::{Error, Method, Status};

    async fn framed<B: Backend>(_app: Arc<App<B>>, _req: Request) -> Result<Response, Error> {
        Ok(Response::builder().header("x-frame-options", "sameorigin").text("ok"))
    }

    #[test]
    fn hardening_twice_is_a_no_op() {
        let mut once = Response::text("hello");
        harden(&mut once);
        let mut twice = Response::text("hello");
        harden(&mut twice);
        harden(&mut twice);

        assert_eq!(once.headers, twice.headers);
        for (name, value) in SECURITY_HEADERS {
            assert_eq!(twice.header_values(name).collect::<Vec<_>>(), vec![value]);
        }
    }

    #[tokio::test]
    async fn every_response_is_hardened_without_clobbering_handlers() {
        let app = test_app();
        let chain = Stack::new().with(common_headers).wrap(framed);
        let res = chain.call(app, request(Method::Get, "/")).await;

        assert_eq!(res.status_code(), Status::Ok);
        assert_eq!(res.header("x-frame-options"), Some("sameorigin"));
        assert_eq!(res.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(res.header("x-xss-protection"), Some("0"));
        assert!(res.header("content-security-policy").unwrap().starts_with("default-src 'self'"));
    }
}
