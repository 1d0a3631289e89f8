//! Route table entries and handler types.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::{HttpRequest, Method};
use crate::server::{Error, HttpResponse, RoutePattern};

/// Type alias for a boxed future that returns a Result<HttpResponse, Error>.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for a handler function that takes an HttpRequest and returns a HandlerFuture.
///
/// The request's `path_params` are filled from the matched pattern before the call.
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// Renders an error raised while serving a request.
pub type ErrorHandlerFn = Arc<dyn Fn(&Error) -> HttpResponse + Send + Sync>;

/// A route registered on the server.
#[derive(Clone)]
pub struct Route {
    /// The compiled path pattern.
    pub pattern: RoutePattern,
    /// The HTTP methods to match.
    pub methods: Vec<Method>,
    /// The handler function.
    pub handler: HandlerFn,
}

impl Route {
    pub fn new(path: &str, methods: Vec<Method>, handler: HandlerFn) -> Self {
        Self {
            pattern: RoutePattern::parse(path),
            methods,
            handler,
        }
    }

    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}
