//! Singletons are kept in a [Registry] - a pair of concurrent maps keyed by name and by type.
//! Every key can be bound only once, so the registry only ever grows. The single exception are
//! bindings registered during application bootstrap: each of them can be shadowed once by a
//! binding with a different [BindingOrigin], e.g. to replace the default environment.
//!
//! Instances are stored type-erased inside [Binding]s and can be retrieved back by the type they
//! were registered with, which can be a concrete type or a `dyn Trait`:
//!
//! ```
//! use std::sync::Arc;
//! use wicket_di::instance_provider::{InstanceProvider, InstancePtr};
//! use wicket_di::registry::{Binding, Registry};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".to_string()
//!     }
//! }
//!
//! let registry = Registry::default();
//! registry
//!     .register_named("greeter", Binding::new(Arc::new(English) as InstancePtr<dyn Greeter>))
//!     .unwrap();
//!
//! let greeter = registry
//!     .named("greeter")
//!     .and_then(|binding| binding.instance::<dyn Greeter>())
//!     .unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```

use crate::error::RegistryError;
use crate::instance_provider::{InstanceAnyPtr, InstanceProvider, InstancePtr};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use derivative::Derivative;
use fxhash::FxBuildHasher;
use std::any::{type_name, TypeId};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Identity of a type used as a registry key. The name is informational only.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Key of a [Binding] in a [Registry].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum BindingKey {
    Name(String),
    Type(TypeKey),
}

impl Display for BindingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingKey::Name(name) => write!(f, "name \"{name}\""),
            BindingKey::Type(type_key) => write!(f, "type {type_key}"),
        }
    }
}

/// Source of a [Binding].
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum BindingOrigin {
    /// Registered by the application before any auto factory runs; can be shadowed once.
    Bootstrap,
    /// Published by an auto factory or registered manually.
    Factory,
    /// Published by the injector after lazily creating a missing shared instance.
    Injector,
}

/// A singleton instance bound to a key.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Binding {
    #[derivative(Debug = "ignore")]
    instance: InstanceAnyPtr,
    type_key: TypeKey,
    origin: BindingOrigin,
}

impl Binding {
    /// Wraps given instance. `T` is the type the instance can later be retrieved as, e.g.
    /// `dyn Trait + Send + Sync` for capabilities.
    pub fn new<T: ?Sized + Send + Sync + 'static>(instance: InstancePtr<T>) -> Self {
        Self {
            instance: InstancePtr::new(instance) as InstanceAnyPtr,
            type_key: TypeKey::of::<T>(),
            origin: BindingOrigin::Factory,
        }
    }

    /// Wraps given instance as a bootstrap binding.
    pub fn bootstrap<T: ?Sized + Send + Sync + 'static>(instance: InstancePtr<T>) -> Self {
        Self::new(instance).with_origin(BindingOrigin::Bootstrap)
    }

    pub fn with_origin(mut self, origin: BindingOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Returns the instance, if it was bound as `T`.
    pub fn instance<T: ?Sized + Send + Sync + 'static>(&self) -> Option<InstancePtr<T>> {
        self.instance.downcast_ref::<InstancePtr<T>>().cloned()
    }

    /// The type this binding was created for.
    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    #[inline]
    pub fn origin(&self) -> BindingOrigin {
        self.origin
    }

    /// Checks if both bindings share the same instance.
    pub fn ptr_eq(&self, other: &Binding) -> bool {
        InstancePtr::ptr_eq(&self.instance, &other.instance)
    }
}

/// Concurrent, append-only store of named and typed bindings.
#[derive(Default, Debug)]
pub struct Registry {
    named: DashMap<String, Binding, FxBuildHasher>,
    typed: DashMap<TypeKey, Binding, FxBuildHasher>,
}

impl Registry {
    #[inline]
    pub fn contains_named(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    #[inline]
    pub fn contains_typed(&self, type_id: TypeId) -> bool {
        self.typed.contains_key(&TypeKey {
            id: type_id,
            name: "",
        })
    }

    /// Returns the total number of bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.named.len() + self.typed.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.typed.is_empty()
    }
}

fn try_register<K: Eq + Hash + Clone>(
    map: &DashMap<K, Binding, FxBuildHasher>,
    key: K,
    binding: Binding,
    binding_key: impl Fn(K) -> BindingKey,
) -> Result<(), RegistryError> {
    match map.entry(key) {
        Entry::Vacant(entry) => {
            entry.insert(binding);
            Ok(())
        }
        Entry::Occupied(mut entry) => {
            if entry.get().origin == BindingOrigin::Bootstrap
                && binding.origin != BindingOrigin::Bootstrap
            {
                debug!(
                    key = %binding_key(entry.key().clone()),
                    "Shadowing bootstrap binding"
                );
                entry.insert(binding);
                Ok(())
            } else {
                Err(RegistryError::DuplicateBinding(binding_key(
                    entry.key().clone(),
                )))
            }
        }
    }
}

impl InstanceProvider for Registry {
    #[inline]
    fn named(&self, name: &str) -> Option<Binding> {
        self.named.get(name).map(|entry| entry.value().clone())
    }

    #[inline]
    fn typed(&self, type_id: TypeId) -> Option<Binding> {
        self.typed
            .get(&TypeKey {
                id: type_id,
                name: "",
            })
            .map(|entry| entry.value().clone())
    }

    fn register_named(&self, name: &str, binding: Binding) -> Result<(), RegistryError> {
        try_register(&self.named, name.to_string(), binding, BindingKey::Name)?;
        debug!(name, "Named binding registered");
        Ok(())
    }

    fn register_typed(&self, type_key: TypeKey, binding: Binding) -> Result<(), RegistryError> {
        try_register(&self.typed, type_key, binding, BindingKey::Type)?;
        debug!(type_name = type_key.name(), "Typed binding registered");
        Ok(())
    }
}
