//! Uniform error surfaces and the render entry point.

use std::backtrace::Backtrace;

use chrono::{Datelike, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::app::App;
use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::session::FLASH;
use crate::status::Status;
use crate::store::Backend;
use crate::templates::TemplateData;

impl<B: Backend> App<B> {
    /// Logs `err` with the request line and answers a generic 500. Debug mode
    /// puts the error and trace in the body instead.
    pub fn server_error(&self, method: Method, uri: &str, err: &Error) -> Response {
        let trace = Backtrace::capture().to_string();
        self.server_error_traced(method, uri, err, &trace)
    }

    pub(crate) fn server_error_traced(
        &self,
        method: Method,
        uri: &str,
        err: &Error,
        trace: &str,
    ) -> Response {
        error!(%method, uri, error = %err, trace, "server error");

        let status = Status::InternalServerError;
        let body = if self.debug {
            format!("{err}\n{trace}")
        } else {
            status.reason().to_owned()
        };
        Response::builder().status(status).text(body)
    }

    /// The status' reason phrase and nothing else.
    pub fn client_error(&self, status: Status) -> Response {
        Response::builder().status(status).text(status.reason())
    }

    /// Answers `err` as a client or server error, by its status.
    pub fn error_response(&self, method: Method, uri: &str, err: &Error) -> Response {
        let status = err.status();
        if status.is_client_error() {
            self.client_error(status)
        } else {
            self.server_error(method, uri, err)
        }
    }

    /// Renders `page` in full before building the response, so a template
    /// error surfaces as a clean 500 rather than a truncated body.
    pub fn render(&self, status: Status, page: &str, data: &TemplateData) -> Result<Response, Error> {
        let body = self.templates.render(page, data)?;
        Ok(Response::builder().status(status).html(body))
    }

    /// Data every page gets: the year, the popped flash, the auth fact and
    /// the CSRF token.
    pub fn new_template_data(&self, req: &Request) -> Result<TemplateData, Error> {
        Ok(TemplateData {
            current_year: Utc::now().year(),
            flash: req.session()?.pop_string(FLASH),
            is_authenticated: req.is_authenticated(),
            csrf_token: req.csrf_token().to_owned(),
            ..TemplateData::default()
        })
    }
}

/// Decodes an urlencoded body into `T`; malformed input is a 400.
pub fn decode_post_form<T: DeserializeOwned>(req: &Request) -> Result<T, Error> {
    serde_urlencoded::from_bytes(req.body()).map_err(|e| {
        debug!(uri = req.uri(), error = %e, "undecodable form");
        Error::Client(Status::BadRequest)
    })
}
