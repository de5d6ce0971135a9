//! Liveness probe.
//!
//! Registered outside the session stack, so a probe never touches the
//! session store or mints cookies.

use std::sync::Arc;

use crate::app::App;
use crate::error::Error;
use crate::request::Request;
use crate::store::Backend;

/// Always `200 OK` with body `OK`.
pub async fn ping<B: Backend>(_app: Arc<App<B>>, _req: Request) -> Result<&'static str, Error> {
    Ok("OK")
}
