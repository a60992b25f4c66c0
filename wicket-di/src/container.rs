//! [Container] is the entry point to dependency injection. It owns a [Registry] of singletons and
//! creates [Injector]s on demand, each using a [ValueResolver] supplied by the caller.
//!
//! ```
//! use wicket_di::container::Container;
//! use wicket_di::instance_provider::InstancePtr;
//! use wicket_di::Injectable;
//! use std::collections::HashMap;
//!
//! #[derive(Injectable, Default)]
//! struct Settings {
//!     #[inject("value='${threads:2}'")]
//!     threads: usize,
//! }
//!
//! #[derive(Injectable, Default)]
//! struct Worker {
//!     #[inject]
//!     settings: Option<InstancePtr<Settings>>,
//! }
//!
//! let container = Container::default();
//! let values = HashMap::from([("threads".to_string(), "8".to_string())]);
//!
//! let worker: Worker = container.create(&values).unwrap();
//! assert_eq!(worker.settings.unwrap().threads, 8);
//! ```

use crate::component::{DynInjectable, Injectable};
use crate::error::{InjectError, RegistryError};
use crate::injector::{Injector, ValueResolver};
use crate::instance_provider::InstanceProvider;
use crate::registry::{Binding, Registry, TypeKey};
use std::any::{type_name, Any, TypeId};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Handle to a registry of singletons. Usually shared behind an
/// [InstancePtr](crate::instance_provider::InstancePtr).
#[derive(Default, Debug)]
pub struct Container {
    registry: Registry,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns an injector working on this container.
    #[inline]
    pub fn injector<'a>(&'a self, resolver: &'a dyn ValueResolver) -> Injector<'a> {
        Injector::new(&self.registry, resolver)
    }

    /// Populates given target. Panics raised during injection are returned as
    /// [InjectError::Panicked].
    pub fn inject<T: Injectable>(
        &self,
        resolver: &dyn ValueResolver,
        target: &mut T,
    ) -> Result<(), InjectError> {
        guarded(type_name::<T>(), || self.injector(resolver).inject(target))
    }

    /// Type-erased version of [Container::inject].
    pub fn inject_dyn(
        &self,
        resolver: &dyn ValueResolver,
        target: &mut dyn DynInjectable,
    ) -> Result<(), InjectError> {
        let owner = target.injectable_type_name();
        guarded(owner, || self.injector(resolver).inject_dyn(target))
    }

    /// Creates a new, injected instance of `T`.
    pub fn create<T: Injectable>(&self, resolver: &dyn ValueResolver) -> Result<T, InjectError> {
        guarded(type_name::<T>(), || self.injector(resolver).create())
    }
}

impl InstanceProvider for Container {
    #[inline]
    fn named(&self, name: &str) -> Option<Binding> {
        self.registry.named(name)
    }

    #[inline]
    fn typed(&self, type_id: TypeId) -> Option<Binding> {
        self.registry.typed(type_id)
    }

    #[inline]
    fn register_named(&self, name: &str, binding: Binding) -> Result<(), RegistryError> {
        self.registry.register_named(name, binding)
    }

    #[inline]
    fn register_typed(&self, type_key: TypeKey, binding: Binding) -> Result<(), RegistryError> {
        self.registry.register_typed(type_key, binding)
    }
}

fn guarded<R>(
    owner: &'static str,
    f: impl FnOnce() -> Result<R, InjectError>,
) -> Result<R, InjectError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!(owner, message = %message, "Injection panicked");
        Err(InjectError::Panicked { owner, message })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
