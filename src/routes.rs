//! Route table and middleware stacks.

use crate::handlers::*;
use crate::health::ping;
use crate::middleware::{
    authenticate, common_headers, csrf_guard, load_and_save, log_request, recover_panic,
    require_authentication, Stack,
};
use crate::router::Router;
use crate::store::Backend;

/// Wraps every request, routed or not: recovery outermost, then logging,
/// then header hardening.
pub fn standard<B: Backend>() -> Stack<B> {
    Stack::new()
        .with(recover_panic)
        .with(log_request)
        .with(common_headers)
}

/// Every page route. `/ping` runs outside the session stack.
pub fn routes<B: Backend>() -> Router<B> {
    let dynamic = Stack::new()
        .with(load_and_save)
        .with(csrf_guard)
        .with(authenticate);
    let protected = dynamic.clone().with(require_authentication);

    Router::new()
        .get("/ping", ping)
        .get("/", dynamic.wrap(home))
        .get("/about", dynamic.wrap(about))
        .get("/snippet/view/{id}", dynamic.wrap(snippet_view))
        .get("/user/signup", dynamic.wrap(user_signup))
        .post("/user/signup", dynamic.wrap(user_signup_post))
        .get("/user/login", dynamic.wrap(user_login))
        .post("/user/login", dynamic.wrap(user_login_post))
        .get("/snippet/create", protected.wrap(snippet_create))
        .post("/snippet/create", protected.wrap(snippet_create_post))
        .get("/account/view", protected.wrap(account_view))
        .get("/account/password/update", protected.wrap(account_password_update))
        .post("/account/password/update", protected.wrap(account_password_update_post))
        .post("/user/logout", protected.wrap(user_logout_post))
}
