//! Request parsing failures.

use thiserror::Error;

/// Why a request could not be turned into an [`HttpRequest`](crate::parser::HttpRequest).
///
/// The server answers every variant with 400.
#[derive(Debug, Error)]
pub enum Error {
    #[error("request is empty")]
    EmptyRequest,

    /// The header block is not valid UTF-8.
    #[error("request head is not valid UTF-8")]
    InvalidUtf8,

    /// The request line is not `METHOD TARGET VERSION`.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("unsupported method: {0}")]
    InvalidMethod(String),

    /// The request target is neither absolute (`/...`) nor `*`.
    #[error("request target must start with '/'")]
    InvalidPath,

    #[error("unsupported protocol version: {0}")]
    InvalidVersion(String),

    /// A header line without a `:` separator.
    #[error("malformed header line")]
    InvalidHeaderFormat,

    #[error("missing required header: {0}")]
    MissingHeader(String),

    #[error("Content-Length is not a number: {0:?}")]
    InvalidContentLength(String),

    #[error("body is not valid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
