//! Request body decoding.

use serde_json::{Map, Value};

use crate::errors::HttpError;
use crate::middleware::{Middleware, Next, RequestContext};
use crate::parser::parse_query;
use crate::server::{Error, HandlerFuture};

/// Decodes JSON and URL-encoded bodies into [`RequestContext::body`].
///
/// Other content types and empty bodies leave `body` unset. A JSON body that
/// does not parse fails the request with 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyParser;

impl BodyParser {
    pub fn decode(ctx: &mut RequestContext) -> Result<(), HttpError> {
        let request = &ctx.request;
        if request.body.is_empty() {
            return Ok(());
        }

        if request.is_json() {
            let value: Value = serde_json::from_slice(&request.body).map_err(|e| {
                HttpError::bad_request()
                    .with_message(format!("Invalid JSON body: {e}"))
                    .with_source(e)
            })?;
            ctx.body = Some(value);
        } else if request.is_form() {
            let text = String::from_utf8_lossy(&request.body);
            let fields: Map<String, Value> = parse_query(&text)
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            ctx.body = Some(Value::Object(fields));
        }
        Ok(())
    }
}

impl Middleware for BodyParser {
    fn handle(&self, mut ctx: RequestContext, next: Next) -> HandlerFuture {
        match Self::decode(&mut ctx) {
            Ok(()) => next.run(ctx),
            Err(e) => Box::pin(async move { Err(Error::from(e)) }),
        }
    }

    fn name(&self) -> &str {
        "body-parser"
    }
}
