//! Session load and flush.

use std::sync::Arc;

use crate::app::App;
use crate::middleware::Next;
use crate::request::Request;
use crate::response::Response;
use crate::store::Backend;

/// Attaches the request's session, runs the rest of the chain, then flushes
/// the session exactly once.
///
/// A flush failure replaces the inner response with a 500, so the client
/// always gets a definite answer.
pub async fn load_and_save<B: Backend>(app: Arc<App<B>>, mut req: Request, next: Next<B>) -> Response {
    let token = req.cookie(&app.sessions.config().cookie_name);
    let session = app.sessions.load(token.as_deref()).await;
    req.context.session = Some(session.clone());

    let method = req.method();
    let uri = req.uri().to_owned();
    let mut res = next.run(Arc::clone(&app), req).await;

    match app.sessions.commit(&session).await {
        Ok(cookie) => {
            res.add_vary("Cookie");
            if let Some(cookie) = cookie {
                res.append_header("set-cookie", &cookie.to_string());
                res.append_header("cache-control", r#"no-cache="Set-Cookie""#);
            }
            res
        }
        Err(e) => app.server_error(method, &uri, &e),
    }
}
