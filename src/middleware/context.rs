//! Per-request state shared by middleware and handlers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::parser::HttpRequest;
use crate::server::{HttpResponse, StatusCode};

/// The request as it travels through a route's middleware chain.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request: HttpRequest,
    /// The decoded body, filled by the body parser when it is enabled.
    pub body: Option<Value>,
    /// Values middleware hands on to later middleware and the handler.
    pub locals: HashMap<String, Value>,
    pub response: ResponseSlot,
}

impl RequestContext {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            body: None,
            locals: HashMap::new(),
            response: ResponseSlot::default(),
        }
    }

    pub fn local(&self, key: &str) -> Option<&Value> {
        self.locals.get(key)
    }

    pub fn set_local(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.locals.insert(key.into(), value.into());
    }
}

#[derive(Debug, Default)]
struct ResponseParts {
    status: Option<StatusCode>,
    headers: Vec<(String, String)>,
}

/// Status and header overrides for the response a handler produces.
///
/// Clones share the same state, so a handler bound to the response can set
/// the status while returning a plain JSON value.
#[derive(Debug, Clone, Default)]
pub struct ResponseSlot {
    parts: Arc<Mutex<ResponseParts>>,
}

impl ResponseSlot {
    fn lock(&self) -> MutexGuard<'_, ResponseParts> {
        self.parts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_status(&self, status: StatusCode) {
        self.lock().status = Some(status);
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.lock().status
    }

    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock().headers.push((name.into(), value.into()));
    }

    /// Applies the overrides. Headers set here win over the response's own.
    pub fn apply(&self, mut response: HttpResponse) -> HttpResponse {
        let parts = self.lock();
        if let Some(status) = parts.status {
            response.status = status;
        }
        for (name, value) in &parts.headers {
            response.set_header(name.clone(), value.clone());
        }
        response
    }
}
