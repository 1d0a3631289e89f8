//! Error types for the HTTP server.

use thiserror::Error;

use crate::errors::HttpError;
use crate::parser::{Error as ParserError, Method};
use crate::server::StatusCode;

/// Errors raised while serving a request.
///
/// Handlers and middleware return this type. The error translator turns
/// [`Error::Http`] into its own status and everything else into a 500.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method {0} not allowed for path: {1}")]
    MethodNotAllowed(Method, String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A status-coded error raised by application code.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A handler asked for an argument the route does not bind the way it expects.
    #[error("Argument error: {0}")]
    Argument(String),

    /// The request body exceeds the configured limit.
    #[error("Request body of {0} bytes exceeds the limit of {1} bytes")]
    PayloadTooLarge(usize, usize),

    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl Error {
    /// The status a response for this error carries.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::ParseError(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed(..) => StatusCode::METHOD_NOT_ALLOWED,
            Error::Http(e) => e.status(),
            Error::PayloadTooLarge(..) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
