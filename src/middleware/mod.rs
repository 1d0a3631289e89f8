//! Middleware chains.
//!
//! A route's chain runs class-level middleware, then method-level middleware,
//! then the handler. Each middleware receives the [`RequestContext`] and a
//! [`Next`] it may call to continue, or return early with its own response
//! or error.

mod body_parser;
mod context;
mod tests;

use std::future::Future;
use std::sync::Arc;

use crate::server::{Error, HandlerFuture, HttpResponse};

pub use body_parser::BodyParser;
pub use context::{RequestContext, ResponseSlot};

/// Request-processing step that runs before a route handler.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, ctx: RequestContext, next: Next) -> HandlerFuture;

    /// Label used in logs and route listings.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F, Fut> Middleware for F
where
    F: Fn(RequestContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    fn handle(&self, ctx: RequestContext, next: Next) -> HandlerFuture {
        Box::pin(self(ctx, next))
    }
}

/// A shared middleware, as stored in controller metadata.
pub type MiddlewareRef = Arc<dyn Middleware>;

/// The final step of a chain.
pub type Endpoint = Arc<dyn Fn(RequestContext) -> HandlerFuture + Send + Sync>;

/// The remainder of a middleware chain.
#[derive(Clone)]
pub struct Next {
    chain: Arc<[MiddlewareRef]>,
    position: usize,
    endpoint: Endpoint,
}

impl Next {
    pub fn new(chain: Arc<[MiddlewareRef]>, endpoint: Endpoint) -> Self {
        Self {
            chain,
            position: 0,
            endpoint,
        }
    }

    /// Runs the next middleware, or the endpoint once the chain is exhausted.
    pub fn run(mut self, ctx: RequestContext) -> HandlerFuture {
        match self.chain.get(self.position).cloned() {
            Some(middleware) => {
                self.position += 1;
                middleware.handle(ctx, self)
            }
            None => (self.endpoint)(ctx),
        }
    }

    /// Number of middleware not yet run.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.position)
    }
}
