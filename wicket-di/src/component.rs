//! One of the basic blocks of dependency injection is an [Injectable] type - one which describes
//! its own injectable fields with a [Schema]. Such types can be created and populated by an
//! [Injector](crate::injector::Injector), which recursively resolves their dependencies.
//!
//! ## Deriving injectable types
//!
//! For convenience, the trait can be automatically derived if the `derive` feature is enabled.
//! Fields take part in injection only when annotated with `#[inject]`; all other fields keep their
//! [Default] value:
//!
//! ```
//! use wicket_di::component::Initializable;
//! use wicket_di::instance_provider::InstancePtr;
//! use wicket_di::Injectable;
//!
//! trait Storage: Send + Sync {}
//!
//! #[derive(Injectable, Default)]
//! struct Pool {
//!     #[inject("value='${pool.size:4}'")]
//!     size: u16,
//! }
//!
//! #[derive(Injectable, Default)]
//! #[inject(init)]
//! struct Service {
//!     // scalar populated from a placeholder with an inline default
//!     #[inject("value='${service.name:users}'")]
//!     name: String,
//!     // capability - a bound dyn Trait, left empty when nothing is bound
//!     #[inject("name='storage',default='zero'")]
//!     storage: Option<InstancePtr<dyn Storage>>,
//!     // shared instance - looked up by type, created and published when missing
//!     #[inject]
//!     pool: Option<InstancePtr<Pool>>,
//!     // composite value - always created from scratch
//!     #[inject]
//!     local: Pool,
//!     // not injected
//!     requests: u64,
//! }
//!
//! impl Initializable for Service {
//!     fn init(&mut self) {
//!         self.requests = 0;
//!     }
//! }
//! ```
//!
//! ### Supported field shapes
//!
//! * scalars - `bool`, integers, floats, [Complex](crate::value::Complex) and `String`
//! * capabilities - `Option<InstancePtr<dyn Trait>>`
//! * owned references - `Option<InstancePtr<T>>` where `T: Injectable`
//! * shared references - `Option<InstancePtr<T>>` for any other `T`, e.g. a client published by a
//!   factory; only looked up, never created
//! * composites - any other `T: Injectable`, including aliases of non-scalar types
//!
//! Type bindings are keyed by [TypeId](std::any::TypeId), which distinguishes `dyn Storage` from
//! `dyn Storage + Send + Sync` even when `Send + Sync` are supertraits. A capability is only found
//! when it is registered under exactly the spelling used by the field.
//! * containers - `Vec`, maps, sets, arrays, tuples and other `Option`s, reset to their default
//!
//! ### Supported annotation keys
//!
//! * `value='literal'` or `value='${key:default}'` - scalar value or placeholder
//! * `default='literal'` - scalar fallback; `default='zero'` leaves references empty when missing
//!
//! Keys a field shape cannot honour, such as `value` on a reference, are rejected with
//! [UnsupportedKey](crate::error::ResolutionError::UnsupportedKey).
//! * `name='name'` - look up a named binding first
//! * `type='private'` - always create a new, unshared instance
//!
//! ### Supported struct configuration
//!
//! * `#[inject(init)]` - call [Initializable::init] after all fields are injected

use crate::error::InjectError;
use crate::injector::Injector;
use crate::schema::Schema;
use crate::value::{Complex32, Complex64};
use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Base trait for types populated by dependency injection. Non-composite types have no schema and
/// injecting them is a no-op.
pub trait Injectable: Default + Send + Sync + 'static {
    /// Returns the injection schema for this type, built once on first use.
    fn schema() -> Result<Option<&'static Schema<Self>>, InjectError> {
        Ok(None)
    }
}

/// Post-injection hook. Runs exactly once per created instance, after all fields are set.
pub trait Initializable {
    fn init(&mut self);
}

/// Object-safe counterpart of [Injectable], for injecting values behind trait objects.
pub trait DynInjectable: Send + Sync {
    fn inject_with(&mut self, injector: &Injector<'_>) -> Result<(), InjectError>;

    fn injectable_type_name(&self) -> &'static str;
}

impl<T: Injectable> DynInjectable for T {
    #[inline]
    fn inject_with(&mut self, injector: &Injector<'_>) -> Result<(), InjectError> {
        injector.inject(self)
    }

    #[inline]
    fn injectable_type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

macro_rules! leaf {
    ($($ty:ty),*) => {
        $(impl Injectable for $ty {})*
    };
}

leaf!(
    (),
    bool,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    char,
    String,
    Complex32,
    Complex64
);

impl<T: Send + Sync + 'static> Injectable for Vec<T> {}

impl<T: Send + Sync + 'static> Injectable for VecDeque<T> {}

impl<T: Send + Sync + 'static> Injectable for Option<T> {}

impl<K: Send + Sync + 'static, V: Send + Sync + 'static, S: Default + Send + Sync + 'static>
    Injectable for HashMap<K, V, S>
{
}

impl<K: Send + Sync + 'static, S: Default + Send + Sync + 'static> Injectable for HashSet<K, S> {}

impl<K: Ord + Send + Sync + 'static, V: Send + Sync + 'static> Injectable for BTreeMap<K, V> {}

impl<K: Ord + Send + Sync + 'static> Injectable for BTreeSet<K> {}
