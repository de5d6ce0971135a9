//! # snipbox
//!
//! A server-rendered snippet-sharing site: the request pipeline, the
//! session-backed identity model it carries, and the template cache that
//! turns typed page data into HTML.
//!
//! ## The pipeline
//!
//! Every request passes through the standard stack, outermost first:
//!
//! - **Panic recovery** turns an unexpected fault anywhere below into a
//!   logged 500 and closes the connection.
//! - **Request logging** records the request line on entry.
//! - **Header hardening** adds CSP, referrer, anti-sniff and anti-framing
//!   headers.
//!
//! Page routes add the dynamic stack:
//!
//! - **Session** loads the session from its cookie and flushes it once the
//!   response is built.
//! - **CSRF guard** rejects unsafe requests that do not echo the token.
//! - **Authentication** re-verifies the session's user on every request.
//!
//! and protected routes add the **access gate**, which redirects anonymous
//! visitors to the login page.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use snipbox::store::{MemoryBackend, MemorySessionStore, MemorySnippetStore, MemoryUserStore};
//! use snipbox::{routes, App, Server, Service, SessionConfig, SessionManager, TemplateCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::<MemoryBackend>::new(
//!         MemorySnippetStore::new(),
//!         MemoryUserStore::new(),
//!         SessionManager::new(MemorySessionStore::new(), SessionConfig::default()),
//!         TemplateCache::new("ui/html")?,
//!     );
//!
//!     Server::bind("0.0.0.0:4000".parse()?)
//!         .serve(Service::new(app, routes()))
//!         .await?;
//!     Ok(())
//! }
//! ```

mod app;
mod config;
mod error;
mod handler;
mod helpers;
mod method;
mod request;
mod response;
mod router;
mod routes;
mod server;
mod status;

pub mod handlers;
pub mod health;
pub mod middleware;
pub mod models;
pub mod session;
pub mod store;
pub mod templates;
pub mod validator;

#[cfg(test)]
mod testing;

pub use app::App;
pub use config::Config;
pub use error::Error;
pub use handler::Handler;
pub use helpers::decode_post_form;
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use routes::{routes, standard};
pub use server::{Server, Service};
pub use session::{Session, SessionConfig, SessionManager};
pub use status::Status;
pub use templates::{TemplateCache, TemplateData};
