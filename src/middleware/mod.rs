//! Middleware layer.
//!
//! Middleware intercepts a request on its way in and the response on its
//! way out. A layer is any `async fn` shaped like
//!
//! ```text
//! async fn layer<B: Backend>(app: Arc<App<B>>, req: Request, next: Next<B>) -> Response
//! ```
//!
//! Calling `next.run(app, req).await` hands control to the rest of the
//! chain; returning without calling it is a terminal short-circuit and no
//! later layer runs. A [`Stack`] is an ordered list of layers, outermost
//! first; [`Stack::wrap`] closes it over an endpoint to give a [`Chain`].
//!
//! Built-in layers, in the order the router composes them:
//!
//! | Layer | Module | Stack |
//! |---|---|---|
//! | [`recover_panic`] | `recover` | every request |
//! | [`log_request`] | `logging` | every request |
//! | [`common_headers`] | `headers` | every request |
//! | [`load_and_save`] | `session` | dynamic |
//! | [`csrf_guard`] | `csrf` | dynamic |
//! | [`authenticate`] | `auth` | dynamic |
//! | [`require_authentication`] | `auth` | protected |

mod auth;
mod csrf;
mod headers;
mod logging;
mod recover;
mod session;

use std::future::Future;
use std::sync::Arc;

use crate::app::App;
use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;
use crate::store::Backend;

pub use auth::{authenticate, require_authentication, LOGIN_PATH};
pub use csrf::{csrf_guard, CsrfConfig, CSRF_FIELD, CSRF_HEADER};
pub use headers::{common_headers, SECURITY_HEADERS};
pub use logging::log_request;
pub use recover::recover_panic;
pub use session::load_and_save;

pub(crate) use headers::harden;
pub(crate) use recover::install_panic_hook;

// ── Middleware trait ──────────────────────────────────────────────────────────

/// One layer of the request pipeline.
///
/// Satisfied by any `async fn(Arc<App<B>>, Request, Next<B>) -> Response`.
pub trait Middleware<B: Backend>: Send + Sync + 'static {
    fn call(&self, app: Arc<App<B>>, req: Request, next: Next<B>) -> BoxFuture;
}

impl<B, F, Fut> Middleware<B> for F
where
    B: Backend,
    F: Fn(Arc<App<B>>, Request, Next<B>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = crate::Response> + Send + 'static,
{
    fn call(&self, app: Arc<App<B>>, req: Request, next: Next<B>) -> BoxFuture {
        Box::pin(self(app, req, next))
    }
}

type BoxedMiddleware<B> = Arc<dyn Middleware<B> + Send + Sync + 'static>;

// ── Next ──────────────────────────────────────────────────────────────────────

/// The remainder of the chain after the current layer.
pub struct Next<B: Backend> {
    layers: Arc<[BoxedMiddleware<B>]>,
    index: usize,
    endpoint: BoxedHandler<B>,
}

impl<B: Backend> Next<B> {
    /// Runs the next layer, or the endpoint once every layer has run.
    pub fn run(mut self, app: Arc<App<B>>, req: Request) -> BoxFuture {
        match self.layers.get(self.index).cloned() {
            Some(layer) => {
                self.index += 1;
                layer.call(app, req, self)
            }
            None => self.endpoint.call(app, req),
        }
    }
}

// ── Stack / Chain ─────────────────────────────────────────────────────────────

/// An ordered list of layers, outermost first. Cheap to clone, so a
/// protected stack can extend the dynamic one.
pub struct Stack<B: Backend> {
    layers: Vec<BoxedMiddleware<B>>,
}

impl<B: Backend> Clone for Stack<B> {
    fn clone(&self) -> Self {
        Self { layers: self.layers.clone() }
    }
}

impl<B: Backend> Default for Stack<B> {
    fn default() -> Self { Self::new() }
}

impl<B: Backend> Stack<B> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Appends `layer` inside every layer already on the stack.
    pub fn with(mut self, layer: impl Middleware<B>) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    /// Closes the stack over `endpoint`.
    pub fn wrap(&self, endpoint: impl Handler<B>) -> Chain<B> {
        self.around(endpoint.into_boxed_handler())
    }

    pub(crate) fn around(&self, endpoint: BoxedHandler<B>) -> Chain<B> {
        Chain { layers: self.layers.clone().into(), endpoint }
    }
}

/// A stack closed over its endpoint; routable like any handler.
pub struct Chain<B: Backend> {
    layers: Arc<[BoxedMiddleware<B>]>,
    endpoint: BoxedHandler<B>,
}

impl<B: Backend> ErasedHandler<B> for Chain<B> {
    fn call(&self, app: Arc<App<B>>, req: Request) -> BoxFuture {
        let next = Next {
            layers: Arc::clone(&self.layers),
            index: 0,
            endpoint: Arc::clone(&self.endpoint),
        };
        next.run(app, req)
    }
}

impl<B: Backend> private::Sealed<B> for Chain<B> {}

impl<B: Backend> Handler<B> for Chain<B> {
    fn into_boxed_handler(self) -> BoxedHandler<B> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{request, test_app};
    use crate::{Error, Method, Response};
    use parking_lot::Mutex;

    static TRACE: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    async fn outer<B: Backend>(app: Arc<App<B>>, req: Request, next: Next<B>) -> Response {
        TRACE.lock().push("outer in");
        let res = next.run(app, req).await;
        TRACE.lock().push("outer out");
        res
    }

    async fn inner<B: Backend>(app: Arc<App<B>>, req: Request, next: Next<B>) -> Response {
        TRACE.lock().push("inner in");
        let res = next.run(app, req).await;
        TRACE.lock().push("inner out");
        res
    }

    async fn stop<B: Backend>(_app: Arc<App<B>>, _req: Request, _next: Next<B>) -> Response {
        TRACE.lock().push("stop");
        Response::text("stopped")
    }

    async fn endpoint<B: Backend>(_app: Arc<App<B>>, _req: Request) -> Result<&'static str, Error> {
        TRACE.lock().push("endpoint");
        Ok("done")
    }

    #[tokio::test]
    async fn layers_run_in_order_and_short_circuit() {
        let app = test_app();

        TRACE.lock().clear();
        let chain = Stack::new().with(outer).with(inner).wrap(endpoint);
        let res = chain.call(Arc::clone(&app), request(Method::Get, "/")).await;
        assert_eq!(res.body(), b"done");
        assert_eq!(
            *TRACE.lock(),
            vec!["outer in", "inner in", "endpoint", "inner out", "outer out"],
        );

        TRACE.lock().clear();
        let chain = Stack::new().with(outer).with(stop).with(inner).wrap(endpoint);
        let res = chain.call(app, request(Method::Get, "/")).await;
        assert_eq!(res.body(), b"stopped");
        assert_eq!(*TRACE.lock(), vec!["outer in", "stop", "outer out"]);
    }
}
