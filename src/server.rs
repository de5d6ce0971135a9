//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Stops calling `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::error::Error;
use crate::handler::ErasedHandler;
use crate::method::Method;
use crate::middleware::{harden, install_panic_hook, Chain};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::routes::standard;
use crate::status::Status;
use crate::store::Backend;

// ── Service ───────────────────────────────────────────────────────────────────

/// The router wrapped in the standard outer stack, bound to its dependencies.
///
/// Transport-agnostic: [`Server`] feeds it hyper requests, and tests call it
/// directly.
pub struct Service<B: Backend> {
    app: Arc<App<B>>,
    entry: Chain<B>,
}

impl<B: Backend> Service<B> {
    pub fn new(app: App<B>, router: Router<B>) -> Self {
        install_panic_hook();
        Self {
            app: Arc::new(app),
            entry: standard().around(Arc::new(router)),
        }
    }

    pub fn app(&self) -> &Arc<App<B>> {
        &self.app
    }

    /// Runs one buffered request through the whole pipeline.
    pub async fn call(&self, req: http::Request<Bytes>, remote_addr: SocketAddr) -> http::Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();

        let Ok(method) = Method::from_str(parts.method.as_str()) else {
            warn!(method = %parts.method, uri = %parts.uri, "unsupported method");
            let mut res = self.app.client_error(Status::MethodNotAllowed);
            harden(&mut res);
            return res.into_http();
        };

        let headers = parts.headers.iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();

        let req = Request::new(method, &parts.uri, parts.version, remote_addr, headers, body);
        self.entry.call(Arc::clone(&self.app), req).await.into_http()
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Starts accepting connections and dispatching them through `service`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve<B: Backend>(self, service: Service<B>) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let service = Arc::new(service);

        info!(addr = %self.addr, "snipbox listening");

        // Every connection task, so shutdown can wait for them.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting at once,
                // even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let service = Arc::clone(&service);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let service = Arc::clone(&service);
                            async move { dispatch(service, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            if is_disconnect(e.as_ref()) {
                                debug!(peer = %remote_addr, "client went away: {e}");
                            } else {
                                error!(peer = %remote_addr, "connection error: {e}");
                            }
                        }
                    });
                }

                // Reap finished tasks so the set does not grow without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("snipbox stopped");
        Ok(())
    }
}

/// Buffers the body, then hands the request to the pipeline. Never fails:
/// every error becomes a response.
async fn dispatch<B: Backend>(
    service: Arc<Service<B>>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(peer = %remote_addr, "failed to read request body: {e}");
            let mut res = Response::builder()
                .status(Status::BadRequest)
                .text(Status::BadRequest.reason());
            harden(&mut res);
            return Ok(res.into_http());
        }
    };

    Ok(service.call(http::Request::from_parts(parts, body), remote_addr).await)
}

/// Aborted writes and half-read requests from a vanished client are routine.
fn is_disconnect(err: &(dyn std::error::Error + 'static)) -> bool {
    match err.downcast_ref::<hyper::Error>() {
        Some(e) => e.is_incomplete_message() || e.is_canceled() || e.is_closed(),
        None => err
            .downcast_ref::<std::io::Error>()
            .is_some_and(|e| matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset,
            )),
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. If a handler cannot be
/// installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
