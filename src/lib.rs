//! Controller-based routing on top of a minimal HTTP server.
//!
//! Controllers declare a path prefix, routes, argument bindings and middleware
//! through a [`ControllerDef`]. At startup the application walks those
//! declarations, nested controllers included, and registers every route on
//! the server together with its middleware chain. Failures are rendered as
//! `{ "statusCode", "message", "stack"? }` JSON.
//!
//! # Features
//!
//! - Route prefixes, nested controllers and RESTful resource routes
//! - Argument binding from path captures, query, body, headers, the request
//!   and the response
//! - Class-level and method-level middleware
//! - A singleton dependency container
//! - Status-coded errors with a JSON error translator
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use microhttp_controllers::prelude::*;
//!
//! struct Health;
//!
//! impl Injectable for Health {
//!     fn construct(_: &Container) -> Result<Self, ContainerError> {
//!         Ok(Health)
//!     }
//! }
//!
//! impl Controller for Health {
//!     fn declare(def: &mut ControllerDef<Self>) -> Result<(), DecoratorError> {
//!         def.prefix("/health");
//!         def.get("/", "check", |_this: Arc<Health>, _args: Args| async {
//!             Reply::json(&serde_json::json!({ "status": "ok" }))
//!         });
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::builder().controller::<Health>().build().await?;
//!     app.listen().await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod container;
pub mod decorators;
pub mod errors;
pub mod handler;
pub mod metadata;
pub mod middleware;
pub mod parser;
pub mod router;
pub mod server;

pub use app::{create_app, App, AppBuilder, AppConfig};
pub use container::{Container, Injectable};
pub use decorators::{controller, Controller, ControllerDef, ControllerRef, DecoratorError, ResourceAction};
pub use errors::{ErrorTranslator, HttpError};
pub use handler::{Args, Reply};
pub use middleware::{Middleware, Next, RequestContext, ResponseSlot};
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ServerConfig, StatusCode};

/// Everything a controller module usually needs.
pub mod prelude {
    pub use crate::app::{App, AppConfig};
    pub use crate::container::{Container, Error as ContainerError, Injectable};
    pub use crate::decorators::{controller, Controller, ControllerDef, DecoratorError, ResourceAction};
    pub use crate::errors::HttpError;
    pub use crate::handler::{Args, Reply};
    pub use crate::middleware::{Next, RequestContext};
    pub use crate::parser::Method;
    pub use crate::server::{Error, HttpResponse, StatusCode};
}
