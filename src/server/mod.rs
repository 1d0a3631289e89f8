//! HTTP server implementation.
//!
//! The transport the controller layer registers its routes on: a tokio
//! accept loop, a first-match route table with `:param` patterns and an error
//! hook that renders failures.

mod response;
mod config;
mod error;
mod handler;
mod http_server;
mod pattern;
mod tests;

// Re-export public items
pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub(crate) use config::env_or;
pub use error::Error;
pub use handler::{ErrorHandlerFn, HandlerFn, HandlerFuture, Route};
pub use http_server::{default_error_handler, HttpServer};
pub use pattern::RoutePattern;
