//! Handler return values.

use serde::Serialize;
use serde_json::Value;

use crate::middleware::ResponseSlot;
use crate::server::{Error, HttpResponse, StatusCode};

/// What a controller method produces.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Serialized as `application/json`, status 200 unless overridden.
    Json(Value),
    /// Sent as `text/plain`, status 200 unless overridden.
    Text(String),
    /// Sent as-is.
    Response(HttpResponse),
    /// No body, status 204 unless overridden.
    Empty,
}

impl Reply {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        Ok(Reply::Json(serde_json::to_value(value)?))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    /// Builds the response, then applies the status and headers set on `slot`.
    pub fn into_response(self, slot: &ResponseSlot) -> Result<HttpResponse, Error> {
        let response = match self {
            Reply::Json(value) => HttpResponse::new(StatusCode::OK).with_json(&value)?,
            Reply::Text(text) => HttpResponse::new(StatusCode::OK)
                .with_content_type("text/plain; charset=utf-8")
                .with_body_string(text),
            Reply::Response(response) => response,
            Reply::Empty => HttpResponse::new(StatusCode::NO_CONTENT),
        };
        Ok(slot.apply(response))
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<HttpResponse> for Reply {
    fn from(response: HttpResponse) -> Self {
        Reply::Response(response)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}
