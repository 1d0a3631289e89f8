//! Controller registration.
//!
//! Walks controller metadata depth-first and turns every declared route into
//! a server [`Route`]: the full path is the concatenation of all enclosing
//! prefixes and the route's own path, and the handler runs the route's
//! middleware chain before the controller method.


use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;

use log::{debug, info};

use crate::container::Container;
use crate::decorators::{Controller, DecoratorError};
use crate::handler;
use crate::metadata::MetadataStore;
use crate::middleware::{BodyParser, MiddlewareRef, Next, RequestContext};
use crate::parser::{HttpRequest, Method};
use crate::server::{HandlerFn, HandlerFuture, Route};

/// Gives `path` exactly one leading slash and drops trailing slashes.
///
/// `""` and `"/"` both normalize to the empty string so they vanish when joined.
/// Repeated slashes inside the path are kept.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Concatenates two path fragments; the root is `/`.
pub fn join_paths(parent: &str, child: &str) -> String {
    let joined = format!("{}{}", normalize_path(parent), normalize_path(child));
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

/// A registered route as listed by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
    pub controller: &'static str,
    pub handler_name: String,
    /// Names of the middleware run before the handler, in order.
    pub middleware: Vec<String>,
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}::{}", self.method, self.path, self.controller, self.handler_name)
    }
}

/// Registration state for one application.
pub struct Registrar<'a> {
    store: &'a mut MetadataStore,
    container: &'a Container,
    body_parser: bool,
    entries: Vec<RouteEntry>,
    routes: Vec<Route>,
    stack: Vec<(TypeId, &'static str)>,
}

impl<'a> Registrar<'a> {
    pub fn new(store: &'a mut MetadataStore, container: &'a Container, body_parser: bool) -> Self {
        Self {
            store,
            container,
            body_parser,
            entries: Vec::new(),
            routes: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Route listing in registration order.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Consumes the registrar, returning the listing and the server routes.
    pub fn into_parts(self) -> (Vec<RouteEntry>, Vec<Route>) {
        (self.entries, self.routes)
    }

    fn enter(&mut self, key: TypeId, name: &'static str) -> Result<(), DecoratorError> {
        if self.stack.iter().any(|(id, _)| *id == key) {
            let mut path: Vec<&str> = self.stack.iter().map(|(_, name)| *name).collect();
            path.push(name);
            return Err(DecoratorError::CyclicNesting(path.join(" -> ")));
        }
        self.stack.push((key, name));
        Ok(())
    }

    fn leave(&mut self) {
        self.stack.pop();
    }
}

/// Registers `C`'s routes below `parent_prefix`, then its nested controllers.
pub fn register_controller<C: Controller>(registrar: &mut Registrar<'_>, parent_prefix: &str) -> Result<(), DecoratorError> {
    registrar.enter(TypeId::of::<C>(), type_name::<C>())?;
    let result = register_inner::<C>(registrar, parent_prefix);
    registrar.leave();
    result
}

fn register_inner<C: Controller>(registrar: &mut Registrar<'_>, parent_prefix: &str) -> Result<(), DecoratorError> {
    let descriptor = registrar.store.descriptor::<C>()?;
    let instance = registrar.container.resolve::<C>()?;
    let prefix = join_paths(parent_prefix, &descriptor.controller.prefix);
    info!("Mapping {} at {prefix}", descriptor.name());

    for route in &descriptor.routes {
        let Some(method_handler) = descriptor.handler(&route.handler_name) else {
            return Err(DecoratorError::UnknownHandler {
                controller: descriptor.name(),
                handler: route.handler_name.clone(),
            });
        };

        let path = join_paths(&prefix, &route.path);
        let mut chain: Vec<MiddlewareRef> = Vec::new();
        if registrar.body_parser {
            chain.push(Arc::new(BodyParser));
        }
        chain.extend(descriptor.middleware.chain_for(&route.handler_name));

        let bindings = descriptor.parameters_for(&route.handler_name).to_vec();
        let endpoint = handler::endpoint(instance.clone(), method_handler, bindings.into());

        let entry = RouteEntry {
            method: route.method,
            path: path.clone(),
            controller: descriptor.name(),
            handler_name: route.handler_name.clone(),
            middleware: chain.iter().map(|m| m.name().to_string()).collect(),
        };
        debug!("  {entry}");

        let chain: Arc<[MiddlewareRef]> = chain.into();
        let handler_fn: HandlerFn = Arc::new(move |request: HttpRequest| -> HandlerFuture {
            Next::new(chain.clone(), endpoint.clone()).run(RequestContext::new(request))
        });

        registrar.entries.push(entry);
        registrar.routes.push(Route::new(&path, vec![route.method], handler_fn));
    }

    for nested in &descriptor.controller.nested {
        nested.register(registrar, &prefix)?;
    }

    Ok(())
}
