//! Authentication resolver and access gate.

use std::sync::Arc;

use tracing::debug;

use crate::app::App;
use crate::error::Error;
use crate::method::Method;
use crate::middleware::Next;
use crate::request::Request;
use crate::response::Response;
use crate::session::{AUTHENTICATED_USER_ID, REDIRECT_PATH_AFTER_LOGIN};
use crate::store::{Backend, UserStore};

/// Where the gate sends anonymous visitors.
pub const LOGIN_PATH: &str = "/user/login";

/// Resolves whether the session names a user that still exists.
///
/// Never blocks: an anonymous request simply continues unauthenticated. The
/// user store is asked on every request, so a deleted account loses access
/// on its next round trip. A store failure aborts with a 500.
pub async fn authenticate<B: Backend>(app: Arc<App<B>>, mut req: Request, next: Next<B>) -> Response {
    let id = match req.session() {
        Ok(session) => session.get_int(AUTHENTICATED_USER_ID),
        Err(e) => return app.server_error(req.method(), req.uri(), &e),
    };

    if id != 0 {
        match app.users.exists(id).await {
            Ok(exists) => {
                if !exists {
                    debug!(user_id = id, "session references a user that no longer exists");
                }
                req.context.authenticated = exists;
            }
            Err(e) => return app.server_error(req.method(), req.uri(), &Error::from(e)),
        }
    }

    next.run(app, req).await
}

/// Redirects anonymous requests to the login page; marks everything it lets
/// through as `no-store`.
pub async fn require_authentication<B: Backend>(app: Arc<App<B>>, req: Request, next: Next<B>) -> Response {
    if !req.is_authenticated() {
        // Only a GET can be replayed safely after login.
        if req.method() == Method::Get {
            if let Ok(session) = req.session() {
                session.put(REDIRECT_PATH_AFTER_LOGIN, req.uri());
            }
        }
        return Response::redirect(LOGIN_PATH);
    }

    let mut res = next.run(app, req).await;
    res.set_header("cache-control", "no-store");
    res
}
