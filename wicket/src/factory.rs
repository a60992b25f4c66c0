//! Auto factories conditionally acquire external resources, e.g. database pools or cache clients,
//! and publish them as singletons for other components. Each factory is an injectable type, so it
//! can use configuration values and instances published by factories started before it:
//!
//! ```
//! use fxhash::FxHashMap;
//! use wicket::factory::AutoFactory;
//! use wicket::register_auto_factory;
//! use wicket_di::instance_provider::{ErrorPtr, InstancePtr};
//! use wicket_di::registry::Binding;
//! use wicket_di::Injectable;
//!
//! struct Pool {
//!     url: String,
//! }
//!
//! #[derive(Injectable, Default)]
//! struct PoolFactory {
//!     #[inject("value='${pool.url:}'")]
//!     url: String,
//!     pool: Option<InstancePtr<Pool>>,
//! }
//!
//! impl AutoFactory for PoolFactory {
//!     fn name(&self) -> &str {
//!         "pool"
//!     }
//!
//!     fn condition(&self) -> bool {
//!         !self.url.is_empty()
//!     }
//!
//!     fn on_start(&mut self) -> Result<(), ErrorPtr> {
//!         self.pool = Some(InstancePtr::new(Pool {
//!             url: self.url.clone(),
//!         }));
//!         Ok(())
//!     }
//!
//!     fn on_stop(&mut self) -> Result<(), ErrorPtr> {
//!         self.pool = None;
//!         Ok(())
//!     }
//!
//!     fn named(&self) -> FxHashMap<String, Binding> {
//!         self.pool
//!             .iter()
//!             .map(|pool| ("pool".to_string(), Binding::new(pool.clone())))
//!             .collect()
//!     }
//! }
//!
//! register_auto_factory!(PoolFactory);
//! ```

use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use wicket_di::component::DynInjectable;
use wicket_di::instance_provider::ErrorPtr;
use wicket_di::registry::{Binding, TypeKey};

/// A component with an ordered, conditional start/stop lifecycle, producing bindings.
#[cfg_attr(test, automock)]
pub trait AutoFactory {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Factories are started in ascending priority order and stopped in reverse. Default 0.
    fn priority(&self) -> i32 {
        0
    }

    /// Checked after injection; a factory is started only if its condition holds.
    fn condition(&self) -> bool {
        true
    }

    fn on_start(&mut self) -> Result<(), ErrorPtr>;

    /// Called exactly once during shutdown, if the factory was started.
    fn on_stop(&mut self) -> Result<(), ErrorPtr>;

    /// Bindings published by name after a successful start.
    fn named(&self) -> FxHashMap<String, Binding> {
        FxHashMap::default()
    }

    /// Bindings published by type after a successful start.
    fn typed(&self) -> FxHashMap<TypeKey, Binding> {
        FxHashMap::default()
    }
}

/// An [AutoFactory] which can be injected.
#[doc(hidden)]
pub trait ManagedFactory: AutoFactory + DynInjectable {
    fn as_injectable(&mut self) -> &mut dyn DynInjectable;
}

impl<T: AutoFactory + DynInjectable> ManagedFactory for T {
    #[inline]
    fn as_injectable(&mut self) -> &mut dyn DynInjectable {
        self
    }
}

pub type AutoFactoryPtr = Box<dyn ManagedFactory>;

/// Statically registered factory constructor. Use [register_auto_factory](crate::register_auto_factory)
/// to create one.
pub struct AutoFactoryRegisterer {
    pub create: fn() -> AutoFactoryPtr,
}

inventory::collect!(AutoFactoryRegisterer);

/// Creates all statically registered factories, in registration order.
pub fn registered_factories() -> Vec<AutoFactoryPtr> {
    inventory::iter::<AutoFactoryRegisterer>
        .into_iter()
        .map(|registerer| (registerer.create)())
        .collect()
}

#[doc(hidden)]
pub mod internal {
    pub use inventory::submit;
}

/// Registers a default-constructed [AutoFactory] for
/// [with_registered_factories](crate::application::ApplicationBuilder::with_registered_factories).
#[macro_export]
macro_rules! register_auto_factory {
    ($ty:ty) => {
        const _: () = {
            fn create() -> $crate::factory::AutoFactoryPtr {
                Box::<$ty>::default()
            }

            $crate::factory::internal::submit! {
                $crate::factory::AutoFactoryRegisterer { create }
            }
        };
    };
}
