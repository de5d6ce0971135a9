//! Unified error type.

use crate::status::Status;
use crate::store::StoreError;

/// The error type returned by snipbox's fallible operations.
///
/// Two kinds reach the wire. [`Error::Client`] carries a 4xx status and is
/// answered with that status' reason phrase. Every other variant is a server
/// error: logged with method and URI, answered with a bare 500.
///
/// Validation failures are not errors. Handlers re-render the form with
/// `422 Unprocessable Content` instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input, CSRF mismatch, missing resource.
    #[error("client error: {}", .0.reason())]
    Client(Status),

    /// A page name that was never built into the template cache.
    #[error("the template {0} does not exist")]
    TemplateNotFound(String),

    #[error("template: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("session codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("random source: {0}")]
    Random(#[from] rand::Error),

    /// A handler asked for the session on a route without the session layer.
    #[error("no session attached to request")]
    NoSession,

    /// An unexpected fault caught by the recovery layer.
    #[error("panic: {0}")]
    Panic(String),
}

impl Error {
    /// The status this error is answered with.
    pub fn status(&self) -> Status {
        match self {
            Self::Client(status) => *status,
            _ => Status::InternalServerError,
        }
    }
}
