//! Rendering of request failures as JSON.

use std::error::Error as StdError;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::server::{Error, ErrorHandlerFn, HttpResponse};

/// The JSON shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Maps request errors to [`ErrorBody`] responses.
///
/// [`HttpError`](crate::errors::HttpError)s keep their status and message.
/// Platform errors keep the status the server assigned them (404, 405, 413,
/// 400 for unparsable input); anything else becomes a 500 carrying the error's
/// message. The `stack` field is only filled outside production.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator {
    pub production: bool,
}

impl ErrorTranslator {
    pub fn new(production: bool) -> Self {
        Self { production }
    }

    pub fn body(&self, err: &Error) -> ErrorBody {
        let message = match err {
            Error::Http(e) => e.message().to_string(),
            other => other.to_string(),
        };
        let stack = (!self.production).then(|| render_stack(err));

        ErrorBody {
            status_code: err.status().as_u16(),
            message,
            stack,
        }
    }

    pub fn render(&self, err: &Error) -> HttpResponse {
        let body = self.body(err);
        let status = err.status();
        match HttpResponse::new(status).with_json(&body) {
            Ok(response) => response,
            Err(_) => HttpResponse::new(status)
                .with_content_type("text/plain")
                .with_body_string(body.message),
        }
    }

    /// Wraps the translator for [`HttpServer::set_error_handler`](crate::server::HttpServer::set_error_handler).
    pub fn into_handler(self) -> ErrorHandlerFn {
        Arc::new(move |err: &Error| self.render(err))
    }
}

/// Debug rendering of the error followed by its `source()` chain.
fn render_stack(err: &Error) -> String {
    let mut stack = format!("{err:?}");
    let mut cause = err.source();
    while let Some(inner) = cause {
        stack.push_str(&format!("\n    caused by: {inner}"));
        cause = inner.source();
    }
    stack
}
