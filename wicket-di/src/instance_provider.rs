use crate::error::RegistryError;
use crate::registry::{Binding, TypeKey};
#[cfg(test)]
use mockall::automock;
use std::any::{Any, TypeId};
use std::error::Error;
use std::sync::Arc;

pub type InstancePtr<T> = Arc<T>;

pub type InstanceAnyPtr = InstancePtr<dyn Any + Send + Sync + 'static>;

/// Type-erased error returned by external collaborators.
pub type ErrorPtr = InstancePtr<dyn Error + Send + Sync + 'static>;

/// Generic source and sink of singleton bindings.
#[cfg_attr(test, automock)]
pub trait InstanceProvider {
    /// Returns the binding registered under given name.
    fn named(&self, name: &str) -> Option<Binding>;

    /// Returns the binding registered for given type.
    fn typed(&self, type_id: TypeId) -> Option<Binding>;

    /// Binds given name. Fails if the name is already bound, unless the existing binding comes
    /// from bootstrap and the new one does not.
    fn register_named(&self, name: &str, binding: Binding) -> Result<(), RegistryError>;

    /// Binds given type. The same rules as for [InstanceProvider::register_named] apply.
    fn register_typed(&self, type_key: TypeKey, binding: Binding) -> Result<(), RegistryError>;
}

/// Helper trait for [InstanceProvider] providing strongly-typed access.
pub trait TypedInstanceProvider {
    /// Typesafe version of [InstanceProvider::named]. Returns `None` when nothing is bound or the
    /// bound instance is not a `T`.
    fn instance_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Option<InstancePtr<T>>;

    /// Typesafe version of [InstanceProvider::typed].
    fn instance_typed<T: ?Sized + Send + Sync + 'static>(&self) -> Option<InstancePtr<T>>;

    /// Binds `T` to given instance. `T` is taken literally: an instance registered as
    /// `InstancePtr<dyn Trait>` is not visible to fields of type
    /// `Option<InstancePtr<dyn Trait + Send + Sync>>`, and the other way round.
    fn register_instance<T: ?Sized + Send + Sync + 'static>(
        &self,
        instance: InstancePtr<T>,
    ) -> Result<(), RegistryError>;
}

impl<P: InstanceProvider + ?Sized> TypedInstanceProvider for P {
    fn instance_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Option<InstancePtr<T>> {
        self.named(name).and_then(|binding| binding.instance::<T>())
    }

    fn instance_typed<T: ?Sized + Send + Sync + 'static>(&self) -> Option<InstancePtr<T>> {
        self.typed(TypeId::of::<T>())
            .and_then(|binding| binding.instance::<T>())
    }

    fn register_instance<T: ?Sized + Send + Sync + 'static>(
        &self,
        instance: InstancePtr<T>,
    ) -> Result<(), RegistryError> {
        self.register_typed(TypeKey::of::<T>(), Binding::new(instance))
    }
}
