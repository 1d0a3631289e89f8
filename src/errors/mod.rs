//! Status-coded application errors and their JSON rendering.
//!
//! Handlers and middleware fail with an [`HttpError`] when the client should
//! see a specific status. The [`ErrorTranslator`] installed by the application
//! renders every request failure as
//! `{ "statusCode": .., "message": .., "stack": .. }`.

mod translator;
mod tests;

use std::error::Error as StdError;
use std::fmt;

use crate::server::StatusCode;

pub use translator::{ErrorBody, ErrorTranslator};

type Source = Box<dyn StdError + Send + Sync + 'static>;

/// An error carrying the HTTP status it should be reported with.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    source: Option<Source>,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause, reported in the development stack.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Replaces the message, keeping status and source.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn canned(status: StatusCode) -> Self {
        Self::new(status, status.reason_phrase())
    }

    /// 400 with the message "Bad Request".
    pub fn bad_request() -> Self {
        Self::canned(StatusCode::BAD_REQUEST)
    }

    /// 401 with the message "Unauthorized".
    pub fn unauthorized() -> Self {
        Self::canned(StatusCode::UNAUTHORIZED)
    }

    /// 403 with the message "Forbidden".
    pub fn forbidden() -> Self {
        Self::canned(StatusCode::FORBIDDEN)
    }

    /// 404 with the message "Not Found".
    pub fn not_found() -> Self {
        Self::canned(StatusCode::NOT_FOUND)
    }

    /// 409 with the message "Conflict".
    pub fn conflict() -> Self {
        Self::canned(StatusCode::CONFLICT)
    }

    /// 500 with the message "Internal Server Error".
    pub fn internal() -> Self {
        Self::canned(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for HttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn StdError + 'static))
    }
}
