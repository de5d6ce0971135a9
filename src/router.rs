//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. A path that exists under
//! another method answers 405 with an `Allow` header; anything else is 404.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::app::App;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::status::Status;
use crate::store::Backend;

/// The application router.
///
/// Build it once at startup and hand it to [`Service::new`](crate::Service::new).
/// Each registration returns `self` so calls chain naturally.
pub struct Router<B: Backend> {
    routes: HashMap<Method, MatchitRouter<BoxedHandler<B>>>,
}

pub(crate) enum Lookup<B: Backend> {
    Found(BoxedHandler<B>, HashMap<String, String>),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl<B: Backend> Router<B> {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registers a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// On a malformed or conflicting path. Routes are fixed at startup, so
    /// this is a programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler<B>) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler<B>) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler<B>) -> Self {
        self.on(Method::Post, path, handler)
    }

    /// HEAD is served by the GET handler wherever no HEAD route exists; the
    /// connection layer drops the body.
    pub(crate) fn lookup(&self, method: Method, path: &str) -> Lookup<B> {
        let found = self.find(method, path).or_else(|| match method {
            Method::Head => self.find(Method::Get, path),
            _ => None,
        });
        if let Some((handler, params)) = found {
            return Lookup::Found(handler, params);
        }

        let mut allowed: Vec<Method> = self.routes.iter()
            .filter(|(m, tree)| **m != method && tree.at(path).is_ok())
            .map(|(m, _)| *m)
            .collect();
        if allowed.is_empty() {
            return Lookup::NotFound;
        }
        if allowed.contains(&Method::Get) && !allowed.contains(&Method::Head) {
            allowed.push(Method::Head);
        }
        allowed.sort();
        Lookup::MethodNotAllowed(allowed)
    }

    fn find(&self, method: Method, path: &str) -> Option<(BoxedHandler<B>, HashMap<String, String>)> {
        let matched = self.routes.get(&method)?.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((Arc::clone(matched.value), params))
    }
}

impl<B: Backend> Default for Router<B> {
    fn default() -> Self { Self::new() }
}

impl<B: Backend> ErasedHandler<B> for Router<B> {
    fn call(&self, app: Arc<App<B>>, mut req: Request) -> BoxFuture {
        match self.lookup(req.method(), req.path()) {
            Lookup::Found(handler, params) => {
                req.params = params;
                handler.call(app, req)
            }
            Lookup::MethodNotAllowed(allowed) => {
                let allow = allowed.iter()
                    .copied()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                Box::pin(async move {
                    let mut res = app.client_error(Status::MethodNotAllowed);
                    res.set_header("allow", &allow);
                    res
                })
            }
            Lookup::NotFound => Box::pin(async move { app.client_error(Status::NotFound) }),
        }
    }
}
