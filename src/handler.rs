//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in one map, so each is
//! hidden behind a trait object (`dyn ErasedHandler<B>`). Handlers receive
//! the shared dependency bundle and the request, and report failure through
//! `Result`:
//!
//! ```text
//! async fn home<B: Backend>(app: Arc<App<B>>, req: Request)
//!     -> Result<Response, Error>                    ← user writes this
//!        ↓ stack.wrap(home) / router.on(.., home)
//! Arc::new(FnHandler(home))                         ← heap-allocated wrapper
//!        ↓ stored as BoxedHandler<B>
//! handler.call(app, req) at request time            ← one vtable dispatch
//!        ↓
//! Ok(r)  → r.into_response()
//! Err(e) → app.error_response(method, uri, &e)      ← 4xx text or logged 500
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::app::App;
use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::store::Backend;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler<B: Backend> {
    fn call(&self, app: Arc<App<B>>, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler<B> = Arc<dyn ErasedHandler<B> + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route endpoint.
///
/// Satisfied by any `async fn` with the signature
///
/// ```text
/// async fn name<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<impl IntoResponse, Error>
/// ```
///
/// and by a [`Chain`](crate::middleware::Chain) produced by
/// [`Stack::wrap`](crate::middleware::Stack::wrap). The trait is sealed.
pub trait Handler<B: Backend>: private::Sealed<B> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<B>;
}

pub(crate) mod private {
    pub trait Sealed<B> {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<B, F, Fut, R> private::Sealed<B> for F
where
    B: Backend,
    F: Fn(Arc<App<B>>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<B, F, Fut, R> Handler<B> for F
where
    B: Backend,
    F: Fn(Arc<App<B>>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<B> {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<B, F, Fut, R> ErasedHandler<B> for FnHandler<F>
where
    B: Backend,
    F: Fn(Arc<App<B>>, Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, app: Arc<App<B>>, req: Request) -> BoxFuture {
        // The request moves into the handler; keep what the error path logs.
        let method = req.method();
        let uri = req.uri().to_owned();
        let fut = (self.0)(Arc::clone(&app), req);
        Box::pin(async move {
            match fut.await {
                Ok(res) => res.into_response(),
                Err(err) => app.error_response(method, &uri, &err),
            }
        })
    }
}
