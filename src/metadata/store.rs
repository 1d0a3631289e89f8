//! Per-controller metadata tables.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::decorators::{Controller, ControllerDef, DecoratorError, MethodHandler};
use crate::metadata::{ControllerMetadata, MiddlewareMetadata, ParameterMetadata, RouteMetadata};

/// Everything one controller type declared.
pub struct ControllerDescriptor<C> {
    pub controller: ControllerMetadata,
    pub routes: Vec<RouteMetadata>,
    /// Parameter bindings per handler, sorted by index.
    pub parameters: HashMap<String, Vec<ParameterMetadata>>,
    pub middleware: MiddlewareMetadata,
    /// The dotted resource name, when declared as a resource.
    pub resource: Option<String>,
    pub(crate) handlers: HashMap<String, MethodHandler<C>>,
}

impl<C> ControllerDescriptor<C> {
    pub fn name(&self) -> &'static str {
        type_name::<C>()
    }

    /// Bindings of one handler in argument order. Empty for handlers without any.
    pub fn parameters_for(&self, handler_name: &str) -> &[ParameterMetadata] {
        self.parameters
            .get(handler_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn handler(&self, handler_name: &str) -> Option<MethodHandler<C>> {
        self.handlers.get(handler_name).cloned()
    }
}

/// Keyed table of controller descriptors.
///
/// A controller's declaration runs the first time its descriptor is requested;
/// later requests return the cached result.
#[derive(Default)]
pub struct MetadataStore {
    descriptors: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The descriptor of `C`, declaring the controller on first use.
    pub fn descriptor<C: Controller>(&mut self) -> Result<Arc<ControllerDescriptor<C>>, DecoratorError> {
        let key = TypeId::of::<C>();
        if let Some(cached) = self.descriptors.get(&key) {
            if let Ok(descriptor) = cached.clone().downcast::<ControllerDescriptor<C>>() {
                return Ok(descriptor);
            }
        }

        let mut def = ControllerDef::<C>::new();
        C::declare(&mut def)?;
        let descriptor = Arc::new(def.finish()?);
        debug!(
            "Declared {name}: prefix {prefix:?}, {routes} routes, {nested} nested",
            name = type_name::<C>(),
            prefix = descriptor.controller.prefix,
            routes = descriptor.routes.len(),
            nested = descriptor.controller.nested.len(),
        );

        self.descriptors.insert(key, descriptor.clone());
        Ok(descriptor)
    }

    pub fn contains<C: Controller>(&self) -> bool {
        self.descriptors.contains_key(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
