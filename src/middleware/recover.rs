//! Panic recovery.
//!
//! The outermost layer. A panic anywhere below it, session flush included,
//! becomes a logged 500 with `Connection: close`, and the connection task
//! keeps running.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use futures_util::FutureExt;

use crate::app::App;
use crate::error::Error;
use crate::middleware::{harden, Next};
use crate::request::Request;
use crate::response::Response;
use crate::store::Backend;

thread_local! {
    /// Trace of the last panic on this thread, left by the hook for the
    /// recovery layer to pick up.
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Chains a hook that records the panic's backtrace ahead of the previous
/// hook. Installed once per process.
pub(crate) fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            LAST_TRACE.with(|t| *t.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_owned()
    }
}

pub async fn recover_panic<B: Backend>(app: Arc<App<B>>, req: Request, next: Next<B>) -> Response {
    let method = req.method();
    let uri = req.uri().to_owned();

    match AssertUnwindSafe(next.run(Arc::clone(&app), req)).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => {
            let err = Error::Panic(panic_message(payload.as_ref()));
            let trace = LAST_TRACE
                .with(|t| t.borrow_mut().take())
                .unwrap_or_default();
            let mut res = app.server_error_traced(method, &uri, &err, &trace);
            res.set_header("connection", "close");
            // Inner layers never saw this response.
            harden(&mut res);
            res
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ErasedHandler;
    use crate::middleware::{common_headers, log_request, Stack};
    use crate::testing::{request, test_app};
    use crate::{Method, Status};

    async fn explode<B: Backend>(_app: Arc<App<B>>, _req: Request) -> Result<Response, Error> {
        panic!("boom");
    }

    #[tokio::test]
    async fn panics_become_hardened_500s() {
        install_panic_hook();
        let app = test_app();
        let chain = Stack::new()
            .with(recover_panic)
            .with(log_request)
            .with(common_headers)
            .wrap(explode);

        let res = chain.call(app, request(Method::Post, "/snippet/create")).await;
        assert_eq!(res.status_code(), Status::InternalServerError);
        assert_eq!(res.body(), b"Internal Server Error");
        assert_eq!(res.header("connection"), Some("close"));
        assert_eq!(res.header("x-frame-options"), Some("deny"));
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload = std::panic::catch_unwind(|| panic!("at the disco")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "at the disco");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "panic");
    }
}
