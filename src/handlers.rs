//! Page handlers.
//!
//! Each handler is an `async fn(Arc<App<B>>, Request) -> Result<Response, Error>`.
//! Validation failures re-render the form with 422; an `Err` becomes a client
//! or server error response in the handler adapter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::app::App;
use crate::error::Error;
use crate::helpers::decode_post_form;
use crate::middleware::LOGIN_PATH;
use crate::request::Request;
use crate::response::Response;
use crate::session::{AUTHENTICATED_USER_ID, FLASH, REDIRECT_PATH_AFTER_LOGIN};
use crate::status::Status;
use crate::store::{Backend, SnippetStore, StoreError, UserStore};
use crate::validator::{self, Validator, EMAIL_RX};

const BLANK: &str = "This field cannot be blank";

// ── Forms ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SnippetCreateForm {
    pub title: String,
    pub content: String,
    pub expires: i64,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl Default for SnippetCreateForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: 365,
            validator: Validator::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserSignupForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserLoginForm {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordUpdateForm {
    #[serde(skip_serializing)]
    pub current_password: String,
    #[serde(skip_serializing)]
    pub new_password: String,
    #[serde(skip_serializing)]
    pub new_password_confirmation: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

// ── Snippets ──────────────────────────────────────────────────────────────────

pub async fn home<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let mut data = app.new_template_data(&req)?;
    data.snippets = app.snippets.latest().await?;
    app.render(Status::Ok, "home.html", &data)
}

pub async fn about<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let data = app.new_template_data(&req)?;
    app.render(Status::Ok, "about.html", &data)
}

pub async fn snippet_view<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let id = req.param("id")
        .and_then(|id| id.parse::<i64>().ok())
        .filter(|id| *id >= 1)
        .ok_or(Error::Client(Status::NotFound))?;

    let snippet = match app.snippets.get(id).await {
        Ok(snippet) => snippet,
        Err(StoreError::NoRecord) => return Err(Error::Client(Status::NotFound)),
        Err(e) => return Err(e.into()),
    };

    let mut data = app.new_template_data(&req)?;
    data.snippet = Some(snippet);
    app.render(Status::Ok, "view.html", &data)
}

pub async fn snippet_create<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let data = app.new_template_data(&req)?.with_form(&SnippetCreateForm::default())?;
    app.render(Status::Ok, "create.html", &data)
}

pub async fn snippet_create_post<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let mut form: SnippetCreateForm = decode_post_form(&req)?;

    let v = &mut form.validator;
    v.check_field(validator::not_blank(&form.title), "title", BLANK);
    v.check_field(validator::max_chars(&form.title, 100), "title", "This field cannot be more than 100 characters");
    v.check_field(validator::not_blank(&form.content), "content", BLANK);
    v.check_field(validator::permitted_value(form.expires, &[1, 7, 365]), "expires", "This field must equal 1, 7 or 365");

    if !form.validator.valid() {
        let data = app.new_template_data(&req)?.with_form(&form)?;
        return app.render(Status::UnprocessableContent, "create.html", &data);
    }

    let id = app.snippets.insert(&form.title, &form.content, form.expires).await?;

    req.session()?.put(FLASH, "Snippet successfully created!");
    Ok(Response::redirect(&format!("/snippet/view/{id}")))
}

// ── Accounts ──────────────────────────────────────────────────────────────────

pub async fn user_signup<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let data = app.new_template_data(&req)?.with_form(&UserSignupForm::default())?;
    app.render(Status::Ok, "signup.html", &data)
}

pub async fn user_signup_post<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let mut form: UserSignupForm = decode_post_form(&req)?;

    let v = &mut form.validator;
    v.check_field(validator::not_blank(&form.name), "name", BLANK);
    v.check_field(validator::not_blank(&form.email), "email", BLANK);
    v.check_field(validator::matches(&form.email, &EMAIL_RX), "email", "This field must be a valid email address");
    v.check_field(validator::not_blank(&form.password), "password", BLANK);
    v.check_field(validator::min_chars(&form.password, 8), "password", "This field must be at least 8 characters");

    if form.validator.valid() {
        match app.users.insert(&form.name, &form.email, &form.password).await {
            Ok(_) => {
                req.session()?.put(FLASH, "Your signup was successful. Please log in.");
                return Ok(Response::redirect(LOGIN_PATH));
            }
            Err(StoreError::DuplicateEmail) => {
                form.validator.add_field_error("email", "Email address is already in use");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let data = app.new_template_data(&req)?.with_form(&form)?;
    app.render(Status::UnprocessableContent, "signup.html", &data)
}

pub async fn user_login<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let data = app.new_template_data(&req)?.with_form(&UserLoginForm::default())?;
    app.render(Status::Ok, "login.html", &data)
}

pub async fn user_login_post<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let mut form: UserLoginForm = decode_post_form(&req)?;

    let v = &mut form.validator;
    v.check_field(validator::not_blank(&form.email), "email", BLANK);
    v.check_field(validator::matches(&form.email, &EMAIL_RX), "email", "This field must be a valid email address");
    v.check_field(validator::not_blank(&form.password), "password", BLANK);

    if form.validator.valid() {
        match app.users.authenticate(&form.email, &form.password).await {
            Ok(id) => {
                let session = req.session()?;
                session.renew_token()?;
                session.put(AUTHENTICATED_USER_ID, id);

                let next = session.pop_string(REDIRECT_PATH_AFTER_LOGIN);
                let location = if next.is_empty() { "/snippet/create" } else { next.as_str() };
                return Ok(Response::redirect(location));
            }
            Err(StoreError::InvalidCredentials) => {
                form.validator.add_non_field_error("Email or password is incorrect");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let data = app.new_template_data(&req)?.with_form(&form)?;
    app.render(Status::UnprocessableContent, "login.html", &data)
}

pub async fn user_logout_post<B: Backend>(_app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let session = req.session()?;
    session.renew_token()?;
    session.remove(AUTHENTICATED_USER_ID);
    session.put(FLASH, "You've been logged out successfully!");
    Ok(Response::redirect("/"))
}

pub async fn account_view<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let id = req.session()?.get_int(AUTHENTICATED_USER_ID);
    let user = match app.users.get(id).await {
        Ok(user) => user,
        Err(StoreError::NoRecord) => return Ok(Response::redirect(LOGIN_PATH)),
        Err(e) => return Err(e.into()),
    };

    let mut data = app.new_template_data(&req)?;
    data.user = Some(user);
    app.render(Status::Ok, "account.html", &data)
}

pub async fn account_password_update<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let data = app.new_template_data(&req)?.with_form(&PasswordUpdateForm::default())?;
    app.render(Status::Ok, "password.html", &data)
}

pub async fn account_password_update_post<B: Backend>(app: Arc<App<B>>, req: Request) -> Result<Response, Error> {
    let mut form: PasswordUpdateForm = decode_post_form(&req)?;

    let v = &mut form.validator;
    v.check_field(validator::not_blank(&form.current_password), "current_password", BLANK);
    v.check_field(validator::not_blank(&form.new_password), "new_password", BLANK);
    v.check_field(validator::min_chars(&form.new_password, 8), "new_password", "This field must be at least 8 characters");
    v.check_field(validator::not_blank(&form.new_password_confirmation), "new_password_confirmation", BLANK);
    v.check_field(
        form.new_password == form.new_password_confirmation,
        "new_password_confirmation",
        "Passwords do not match",
    );

    if form.validator.valid() {
        let session = req.session()?;
        let id = session.get_int(AUTHENTICATED_USER_ID);
        match app.users.password_update(id, &form.current_password, &form.new_password).await {
            Ok(()) => {
                session.renew_token()?;
                session.put(FLASH, "Your password has been updated!");
                return Ok(Response::redirect("/account/view"));
            }
            Err(StoreError::InvalidCredentials) => {
                form.validator.add_field_error("current_password", "Current password is incorrect");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let data = app.new_template_data(&req)?.with_form(&form)?;
    app.render(Status::UnprocessableContent, "password.html", &data)
}
