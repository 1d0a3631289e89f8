//! Declaring controllers.
//!
//! A controller is a type implementing [`Controller`]. Its `declare` function
//! receives a [`ControllerDef`] and records, on the class level, a path prefix
//! (or a resource name), middleware and nested controllers, and, per handler,
//! the route, the argument bindings and method-level middleware.
//!
//! ```
//! use std::sync::Arc;
//! use microhttp_controllers::container::{Container, Injectable};
//! use microhttp_controllers::decorators::{Controller, ControllerDef, DecoratorError};
//! use microhttp_controllers::handler::{Args, Reply};
//! use microhttp_controllers::server::Error;
//!
//! struct Greeter;
//!
//! impl Injectable for Greeter {
//!     fn construct(_: &Container) -> Result<Self, microhttp_controllers::container::Error> {
//!         Ok(Greeter)
//!     }
//! }
//!
//! impl Greeter {
//!     async fn hello(self: Arc<Self>, args: Args) -> Result<Reply, Error> {
//!         let name = args.require(0)?;
//!         Ok(Reply::text(format!("Hello, {name}!")))
//!     }
//! }
//!
//! impl Controller for Greeter {
//!     fn declare(def: &mut ControllerDef<Self>) -> Result<(), DecoratorError> {
//!         def.prefix("/greet");
//!         def.get("/:name", "hello", Greeter::hello).path(0, "name");
//!         Ok(())
//!     }
//! }
//! ```

mod error;
mod resource;

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::container::Injectable;
use crate::handler::{Args, Reply};
use crate::metadata::{
    ControllerDescriptor, ControllerMetadata, MiddlewareMetadata, ParamSource, ParameterMetadata,
    RouteMetadata,
};
use crate::middleware::{Middleware, MiddlewareRef};
use crate::parser::Method;
use crate::router::{register_controller, Registrar};
use crate::server::Error;

pub use error::DecoratorError;
pub use resource::{resource_path, ResourceAction};

/// The future a controller method returns.
pub type ReplyFuture = Pin<Box<dyn Future<Output = Result<Reply, Error>> + Send>>;

/// A controller method bound to a route.
pub type MethodHandler<C> = Arc<dyn Fn(Arc<C>, Args) -> ReplyFuture + Send + Sync>;

/// A type that groups routes under a common prefix.
pub trait Controller: Injectable {
    fn declare(def: &mut ControllerDef<Self>) -> Result<(), DecoratorError>;
}

/// Type-erased handle to a controller type, used for bootstrap lists and nesting.
#[derive(Clone, Copy)]
pub struct ControllerRef {
    type_id: TypeId,
    name: &'static str,
    register: fn(&mut Registrar<'_>, &str) -> Result<(), DecoratorError>,
}

impl ControllerRef {
    pub fn of<C: Controller>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
            register: register_controller::<C>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers the controller and its nested controllers below `parent_prefix`.
    pub fn register(&self, registrar: &mut Registrar<'_>, parent_prefix: &str) -> Result<(), DecoratorError> {
        (self.register)(registrar, parent_prefix)
    }
}

impl fmt::Debug for ControllerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ControllerRef").field(&self.name).finish()
    }
}

impl PartialEq for ControllerRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ControllerRef {}

/// Shorthand for [`ControllerRef::of`].
pub fn controller<C: Controller>() -> ControllerRef {
    ControllerRef::of::<C>()
}

/// Declaration builder for one controller type.
pub struct ControllerDef<C> {
    controller: ControllerMetadata,
    routes: Vec<RouteMetadata>,
    parameters: HashMap<String, Vec<ParameterMetadata>>,
    middleware: MiddlewareMetadata,
    resource: Option<String>,
    actions: Vec<ResourceAction>,
    handlers: HashMap<String, MethodHandler<C>>,
    errors: Vec<DecoratorError>,
}

impl<C: Controller> ControllerDef<C> {
    pub(crate) fn new() -> Self {
        Self {
            controller: ControllerMetadata::default(),
            routes: Vec::new(),
            parameters: HashMap::new(),
            middleware: MiddlewareMetadata::default(),
            resource: None,
            actions: Vec::new(),
            handlers: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Sets the path prefix of every route in this controller.
    pub fn prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.controller.prefix = prefix.into();
        self
    }

    /// Declares the controller as a REST resource.
    ///
    /// The prefix becomes the collection path of the dotted `name`, see
    /// [`resource_path`]. Actions are then added with [`action`](Self::action).
    pub fn resource(&mut self, name: &str) -> Result<&mut Self, DecoratorError> {
        self.controller.prefix = resource_path(name, false)?;
        self.resource = Some(name.to_string());
        Ok(self)
    }

    /// Adds class-level middleware, run before any handler's own middleware.
    pub fn middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middleware.class_level.push(Arc::new(middleware));
        self
    }

    /// Adds an already shared middleware on the class level.
    pub fn middleware_ref(&mut self, middleware: MiddlewareRef) -> &mut Self {
        self.middleware.class_level.push(middleware);
        self
    }

    /// Mounts `N` below this controller's prefix.
    pub fn nested<N: Controller>(&mut self) -> &mut Self {
        self.controller.nested.push(ControllerRef::of::<N>());
        self
    }

    /// Declares a route handled by `handler`, registered under `name`.
    pub fn route<F, Fut>(&mut self, method: Method, path: impl Into<String>, name: &str, handler: F) -> RouteDecl<'_, C>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Error>> + Send + 'static,
    {
        let handler: MethodHandler<C> = Arc::new(move |this: Arc<C>, args: Args| -> ReplyFuture {
            Box::pin(handler(this, args))
        });

        if self.handlers.insert(name.to_string(), handler).is_some() {
            self.errors.push(DecoratorError::DuplicateHandler {
                controller: type_name::<C>(),
                handler: name.to_string(),
            });
        } else {
            self.routes.push(RouteMetadata {
                method,
                path: path.into(),
                handler_name: name.to_string(),
            });
        }

        RouteDecl {
            def: self,
            handler_name: name.to_string(),
        }
    }

    pub fn get<F, Fut>(&mut self, path: impl Into<String>, name: &str, handler: F) -> RouteDecl<'_, C>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Error>> + Send + 'static,
    {
        self.route(Method::GET, path, name, handler)
    }

    pub fn post<F, Fut>(&mut self, path: impl Into<String>, name: &str, handler: F) -> RouteDecl<'_, C>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Error>> + Send + 'static,
    {
        self.route(Method::POST, path, name, handler)
    }

    pub fn put<F, Fut>(&mut self, path: impl Into<String>, name: &str, handler: F) -> RouteDecl<'_, C>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Error>> + Send + 'static,
    {
        self.route(Method::PUT, path, name, handler)
    }

    pub fn patch<F, Fut>(&mut self, path: impl Into<String>, name: &str, handler: F) -> RouteDecl<'_, C>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Error>> + Send + 'static,
    {
        self.route(Method::PATCH, path, name, handler)
    }

    pub fn delete<F, Fut>(&mut self, path: impl Into<String>, name: &str, handler: F) -> RouteDecl<'_, C>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Error>> + Send + 'static,
    {
        self.route(Method::DELETE, path, name, handler)
    }

    pub fn head<F, Fut>(&mut self, path: impl Into<String>, name: &str, handler: F) -> RouteDecl<'_, C>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Error>> + Send + 'static,
    {
        self.route(Method::HEAD, path, name, handler)
    }

    pub fn options<F, Fut>(&mut self, path: impl Into<String>, name: &str, handler: F) -> RouteDecl<'_, C>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Error>> + Send + 'static,
    {
        self.route(Method::OPTIONS, path, name, handler)
    }

    /// Declares one of the conventional resource actions.
    ///
    /// The route's method, path and handler name follow from `action`.
    pub fn action<F, Fut>(&mut self, action: ResourceAction, handler: F) -> RouteDecl<'_, C>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Error>> + Send + 'static,
    {
        self.actions.push(action);
        self.route(action.method(), action.relative_path(), action.handler_name(), handler)
    }

    /// Binds an argument of the handler registered as `handler_name`.
    ///
    /// Bindings may be added in any order; registration sorts them by index.
    pub fn param(&mut self, handler_name: &str, binding: ParameterMetadata) -> &mut Self {
        self.parameters
            .entry(handler_name.to_string())
            .or_default()
            .push(binding);
        self
    }

    /// Adds middleware that only runs for `handler_name`.
    pub fn use_on(&mut self, handler_name: &str, middleware: impl Middleware) -> &mut Self {
        self.middleware
            .per_method
            .entry(handler_name.to_string())
            .or_default()
            .push(Arc::new(middleware));
        self
    }

    /// Validates the declaration and freezes it into a descriptor.
    pub(crate) fn finish(mut self) -> Result<ControllerDescriptor<C>, DecoratorError> {
        let controller = type_name::<C>();

        if let Some(error) = self.errors.drain(..).next() {
            return Err(error);
        }

        if self.resource.is_none() {
            if let Some(action) = self.actions.first() {
                return Err(DecoratorError::ActionWithoutResource {
                    controller,
                    action: action.handler_name(),
                });
            }
        }

        let referenced = self.parameters.keys().chain(self.middleware.per_method.keys());
        for handler in referenced {
            if !self.handlers.contains_key(handler) {
                return Err(DecoratorError::UnknownHandler {
                    controller,
                    handler: handler.clone(),
                });
            }
        }

        for (handler, bindings) in self.parameters.iter_mut() {
            bindings.sort_by_key(|binding| binding.index);
            for (expected, binding) in bindings.iter().enumerate() {
                if binding.index < expected {
                    return Err(DecoratorError::DuplicateParameterIndex {
                        controller,
                        handler: handler.clone(),
                        index: binding.index,
                    });
                }
                if binding.index > expected {
                    return Err(DecoratorError::MissingParameterIndex {
                        controller,
                        handler: handler.clone(),
                        index: expected,
                    });
                }
                if binding.source == ParamSource::Header && binding.name.is_none() {
                    return Err(DecoratorError::MissingParameterName {
                        controller,
                        handler: handler.clone(),
                        index: binding.index,
                        kind: binding.source,
                    });
                }
            }
        }

        Ok(ControllerDescriptor {
            controller: self.controller,
            routes: self.routes,
            parameters: self.parameters,
            middleware: self.middleware,
            resource: self.resource,
            handlers: self.handlers,
        })
    }
}

/// Per-route declarations: argument bindings and method-level middleware.
pub struct RouteDecl<'a, C: Controller> {
    def: &'a mut ControllerDef<C>,
    handler_name: String,
}

impl<'a, C: Controller> RouteDecl<'a, C> {
    fn bind(self, source: ParamSource, name: Option<&str>, index: usize) -> Self {
        let binding = ParameterMetadata::new(source, name.map(str::to_string), index);
        self.def.param(&self.handler_name, binding);
        self
    }

    /// Argument `index` is the path capture `name`.
    pub fn path(self, index: usize, name: &str) -> Self {
        self.bind(ParamSource::Path, Some(name), index)
    }

    /// Argument `index` is all path captures.
    pub fn path_params(self, index: usize) -> Self {
        self.bind(ParamSource::Path, None, index)
    }

    /// Argument `index` is query parameter `name`, or the whole query map for `None`.
    pub fn query(self, index: usize, name: Option<&str>) -> Self {
        self.bind(ParamSource::Query, name, index)
    }

    /// Argument `index` is the decoded body, or its top-level field `name`.
    pub fn body(self, index: usize, name: Option<&str>) -> Self {
        self.bind(ParamSource::Body, name, index)
    }

    /// Argument `index` is request header `name`.
    pub fn header(self, index: usize, name: &str) -> Self {
        self.bind(ParamSource::Header, Some(name), index)
    }

    /// Argument `index` is the request context.
    pub fn request(self, index: usize) -> Self {
        self.bind(ParamSource::Request, None, index)
    }

    /// Argument `index` is the response slot.
    pub fn response(self, index: usize) -> Self {
        self.bind(ParamSource::Response, None, index)
    }

    /// Adds middleware that only runs for this route.
    pub fn middleware(self, middleware: impl Middleware) -> Self {
        self.def.use_on(&self.handler_name, middleware);
        self
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }
}
