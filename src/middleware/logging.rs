//! Request logging.

use std::sync::Arc;

use tracing::info;

use crate::app::App;
use crate::middleware::Next;
use crate::request::Request;
use crate::response::Response;
use crate::store::Backend;

/// Logs the request line on entry, so requests that fail further in are
/// still on record.
pub async fn log_request<B: Backend>(app: Arc<App<B>>, req: Request, next: Next<B>) -> Response {
    info!(
        ip = %req.remote_addr().ip(),
        proto = ?req.version(),
        method = %req.method(),
        uri = req.uri(),
        "received request",
    );
    next.run(app, req).await
}
