//! Controller metadata.
//!
//! The tables a controller's declaration fills in and registration reads:
//! the controller prefix and nesting, its routes, the parameter bindings of
//! each handler and the middleware attached to the class and to each handler.

mod store;

use std::collections::HashMap;
use std::fmt;

use crate::decorators::ControllerRef;
use crate::middleware::MiddlewareRef;
use crate::parser::Method;

pub use store::{ControllerDescriptor, MetadataStore};

/// Prefix and nested controllers of one controller type.
#[derive(Clone, Default)]
pub struct ControllerMetadata {
    pub prefix: String,
    pub nested: Vec<ControllerRef>,
}

impl fmt::Debug for ControllerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerMetadata")
            .field("prefix", &self.prefix)
            .field("nested", &self.nested.iter().map(ControllerRef::name).collect::<Vec<_>>())
            .finish()
    }
}

/// One declared route, relative to its controller's prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMetadata {
    pub method: Method,
    pub path: String,
    pub handler_name: String,
}

/// Where a handler argument is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    /// A route pattern capture (`:id`), or all of them when unnamed.
    Path,
    /// A query parameter, or the whole query map when unnamed.
    Query,
    /// The decoded body, or one of its top-level fields when named.
    Body,
    /// A request header, or all headers when unnamed.
    Header,
    /// The request context itself.
    Request,
    /// The response slot.
    Response,
}

impl ParamSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamSource::Path => "path",
            ParamSource::Query => "query",
            ParamSource::Body => "body",
            ParamSource::Header => "header",
            ParamSource::Request => "request",
            ParamSource::Response => "response",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding of one handler argument position to a request source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMetadata {
    pub source: ParamSource,
    pub name: Option<String>,
    pub index: usize,
}

impl ParameterMetadata {
    pub fn new(source: ParamSource, name: Option<String>, index: usize) -> Self {
        Self { source, name, index }
    }

    /// Human-readable label for error messages, e.g. `path 'id'`.
    pub fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("{} '{name}'", self.source),
            None => self.source.to_string(),
        }
    }
}

/// Middleware attached to a controller.
#[derive(Clone, Default)]
pub struct MiddlewareMetadata {
    pub class_level: Vec<MiddlewareRef>,
    pub per_method: HashMap<String, Vec<MiddlewareRef>>,
}

impl MiddlewareMetadata {
    /// The chain for one handler: class-level middleware first, then the handler's own.
    pub fn chain_for(&self, handler_name: &str) -> Vec<MiddlewareRef> {
        let mut chain = self.class_level.clone();
        if let Some(method_level) = self.per_method.get(handler_name) {
            chain.extend(method_level.iter().cloned());
        }
        chain
    }
}

impl fmt::Debug for MiddlewareMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_method: HashMap<&str, Vec<&str>> = self
            .per_method
            .iter()
            .map(|(name, chain)| (name.as_str(), chain.iter().map(|m| m.name()).collect()))
            .collect();
        f.debug_struct("MiddlewareMetadata")
            .field("class_level", &self.class_level.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("per_method", &per_method)
            .finish()
    }
}
