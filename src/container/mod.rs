//! Dependency container.
//!
//! A keyed map of singletons. Controllers and services implement
//! [`Injectable`] and pull their dependencies from the container in
//! `construct`; the first instance stored for a type is the one every
//! later resolution returns.


use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::debug;
use thiserror::Error;

/// Errors raised while resolving dependencies.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no instance registered for {0}")]
    NotRegistered(&'static str),

    #[error("dependency cycle: {0}")]
    Cycle(String),

    #[error("failed to construct {type_name}: {message}")]
    Construction { type_name: &'static str, message: String },
}

/// A type the container can build.
pub trait Injectable: Sized + Send + Sync + 'static {
    fn construct(container: &Container) -> Result<Self, Error>;
}

type Instance = Arc<dyn Any + Send + Sync>;

thread_local! {
    // Types under construction on this thread, tagged with their container.
    static RESOLVING: RefCell<Vec<(usize, TypeId, &'static str)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a type as under construction until dropped.
struct ResolvingGuard {
    container: usize,
    key: TypeId,
}

impl ResolvingGuard {
    fn enter(container: usize, key: TypeId, name: &'static str) -> Result<Self, Error> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            let chain: Vec<(TypeId, &str)> = stack
                .iter()
                .filter(|(owner, _, _)| *owner == container)
                .map(|(_, id, name)| (*id, *name))
                .collect();
            if chain.iter().any(|(id, _)| *id == key) {
                let mut path: Vec<&str> = chain.iter().map(|(_, name)| *name).collect();
                path.push(name);
                return Err(Error::Cycle(path.join(" -> ")));
            }
            stack.push((container, key, name));
            Ok(Self { container, key })
        })
    }
}

impl Drop for ResolvingGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack
                .iter()
                .rposition(|(owner, id, _)| *owner == self.container && *id == self.key)
            {
                stack.remove(pos);
            }
        });
    }
}

/// Shared singleton registry. Clones refer to the same instances.
#[derive(Clone, Default)]
pub struct Container {
    instances: Arc<RwLock<HashMap<TypeId, Instance>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    fn instances(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, Instance>> {
        self.instances.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn instances_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<TypeId, Instance>> {
        self.instances.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Identity shared by all clones of this container.
    fn id(&self) -> usize {
        Arc::as_ptr(&self.instances) as *const () as usize
    }

    /// Registers `value` as the instance of `T`, replacing any previous one.
    pub fn register<T: Send + Sync + 'static>(&self, value: T) -> &Self {
        self.register_arc(Arc::new(value))
    }

    pub fn register_arc<T: Send + Sync + 'static>(&self, value: Arc<T>) -> &Self {
        self.instances_mut().insert(TypeId::of::<T>(), value);
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.instances().contains_key(&TypeId::of::<T>())
    }

    /// The registered instance of `T`, without constructing one.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let instance = self.instances().get(&TypeId::of::<T>())?.clone();
        instance.downcast::<T>().ok()
    }

    /// Like [`get`](Self::get), failing with [`Error::NotRegistered`].
    pub fn require<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        self.get::<T>().ok_or(Error::NotRegistered(type_name::<T>()))
    }

    /// The instance of `T`, constructing and caching it when none is registered.
    ///
    /// Cycles are tracked per thread, so concurrent first resolutions of the
    /// same type may each construct it; the first one stored is kept.
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, Error> {
        if let Some(existing) = self.get::<T>() {
            return Ok(existing);
        }

        let key = TypeId::of::<T>();
        let guard = ResolvingGuard::enter(self.id(), key, type_name::<T>())?;
        let constructed = T::construct(self);
        drop(guard);
        let instance: Instance = Arc::new(constructed?);
        debug!("Constructed {}", type_name::<T>());

        // An instance registered while constructing wins over the new one.
        let stored = self.instances_mut().entry(key).or_insert(instance).clone();
        stored
            .downcast::<T>()
            .map_err(|_| Error::NotRegistered(type_name::<T>()))
    }

    pub fn len(&self) -> usize {
        self.instances().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances().is_empty()
    }
}
