//! A [Schema] describes how to populate the injectable fields of a given type. It is normally
//! generated by `#[derive(Injectable)]` and built once per type, but can be assembled by hand with
//! a [SchemaBuilder] when deriving is not an option:
//!
//! ```
//! use wicket_di::component::Injectable;
//! use wicket_di::error::InjectError;
//! use wicket_di::schema::{FieldKind, Schema, SchemaBuilder};
//! use std::sync::OnceLock;
//!
//! #[derive(Default)]
//! struct Server {
//!     port: u16,
//! }
//!
//! fn port(server: &mut Server) -> &mut u16 {
//!     &mut server.port
//! }
//!
//! impl Injectable for Server {
//!     fn schema() -> Result<Option<&'static Schema<Self>>, InjectError> {
//!         static SCHEMA: OnceLock<Result<Schema<Server>, InjectError>> = OnceLock::new();
//!         SCHEMA
//!             .get_or_init(|| {
//!                 SchemaBuilder::new()
//!                     .field("port", "value='${server.port:8080}'", FieldKind::scalar(port))
//!                     .build()
//!             })
//!             .as_ref()
//!             .map(Some)
//!             .map_err(Clone::clone)
//!     }
//! }
//! ```

use crate::component::{Initializable, Injectable};
use crate::error::{InjectError, ResolutionError};
use crate::injector::Injector;
use crate::instance_provider::InstancePtr;
use crate::metadata::{parse, FieldMetadata, DEFAULT, TYPE, VALUE};
use crate::registry::{Binding, TypeKey};
use crate::value::{Scalar, ScalarKind, ScalarValue};
use std::any::type_name;
use std::fmt::{Debug, Formatter};

/// Function returning a mutable reference to a single field.
pub type FieldAccessor<T, F> = fn(&mut T) -> &mut F;

type ScalarSetter<T> = Box<dyn Fn(&mut T, ScalarValue) -> bool + Send + Sync>;

type ReferenceSetter<T> =
    Box<dyn Fn(&mut T, Option<&Binding>) -> Result<(), ResolutionError> + Send + Sync>;

type CompositeInjector<T> =
    Box<dyn Fn(&mut T, &Injector<'_>) -> Result<(), InjectError> + Send + Sync>;

type Constructor = fn(&Injector<'_>) -> Result<Binding, InjectError>;

/// Field populated from a literal or a placeholder.
pub struct ScalarField<T> {
    kind: ScalarKind,
    assign: ScalarSetter<T>,
}

impl<T> ScalarField<T> {
    #[inline]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Stores given value. Returns `false` when the value is not of [Self::kind].
    #[inline]
    pub fn assign(&self, target: &mut T, value: ScalarValue) -> bool {
        (self.assign)(target, value)
    }
}

/// Field holding a shared instance taken from a registry.
pub struct ReferenceField<T> {
    type_key: TypeKey,
    assign: ReferenceSetter<T>,
}

impl<T> ReferenceField<T> {
    /// The type the referenced instance is registered as.
    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Stores the instance from given binding, or clears the field when there is none.
    #[inline]
    pub fn assign(&self, target: &mut T, binding: Option<&Binding>) -> Result<(), ResolutionError> {
        (self.assign)(target, binding)
    }
}

/// Reference field which can also construct its own instance.
pub struct OwnedField<T> {
    reference: ReferenceField<T>,
    construct: Constructor,
}

impl<T> OwnedField<T> {
    #[inline]
    pub fn reference(&self) -> &ReferenceField<T> {
        &self.reference
    }

    /// Creates and injects a new, unpublished instance.
    #[inline]
    pub fn construct(&self, injector: &Injector<'_>) -> Result<Binding, InjectError> {
        (self.construct)(injector)
    }
}

/// Shape of an injectable field, which determines how its value is resolved.
pub enum FieldKind<T> {
    Scalar(ScalarField<T>),
    Capability(ReferenceField<T>),
    OwnedRef(OwnedField<T>),
    /// Reference to an instance which cannot be constructed by the injector, only looked up.
    Shared(ReferenceField<T>),
    Composite(CompositeInjector<T>),
    Container(Box<dyn Fn(&mut T) + Send + Sync>),
}

impl<T: 'static> FieldKind<T> {
    pub fn scalar<F: Scalar>(accessor: FieldAccessor<T, F>) -> Self {
        FieldKind::Scalar(ScalarField {
            kind: F::KIND,
            assign: Box::new(move |target: &mut T, value: ScalarValue| {
                match F::from_value(value) {
                    Some(value) => {
                        *accessor(target) = value;
                        true
                    }
                    None => false,
                }
            }),
        })
    }

    /// Field holding a trait object, e.g. `Option<InstancePtr<dyn Trait + Send + Sync>>`.
    ///
    /// The binding is found by the exact type of `F`: `dyn Trait` and `dyn Trait + Send + Sync`
    /// are different types, so the field must be spelled the same way as the type the instance was
    /// registered as.
    pub fn capability<F: ?Sized + Send + Sync + 'static>(
        accessor: FieldAccessor<T, Option<InstancePtr<F>>>,
    ) -> Self {
        FieldKind::Capability(reference_field(accessor))
    }

    pub fn owned<F: Injectable>(accessor: FieldAccessor<T, Option<InstancePtr<F>>>) -> Self {
        FieldKind::OwnedRef(OwnedField {
            reference: reference_field(accessor),
            construct: construct::<F>,
        })
    }

    /// Field holding a registered instance of a type the injector cannot create, e.g. a client
    /// handle published by an auto factory. Missing bindings are errors unless `default='zero'`.
    pub fn shared<F: Send + Sync + 'static>(
        accessor: FieldAccessor<T, Option<InstancePtr<F>>>,
    ) -> Self {
        FieldKind::Shared(reference_field(accessor))
    }

    pub fn composite<F: Injectable>(accessor: FieldAccessor<T, F>) -> Self {
        FieldKind::Composite(Box::new(
            move |target: &mut T, injector: &Injector<'_>| {
                *accessor(target) = injector.create::<F>()?;
                Ok(())
            },
        ))
    }

    pub fn container<F: Default + 'static>(accessor: FieldAccessor<T, F>) -> Self {
        FieldKind::Container(Box::new(move |target: &mut T| {
            *accessor(target) = F::default();
        }))
    }

    fn shape(&self) -> &'static str {
        match self {
            FieldKind::Scalar(_) => "scalar",
            FieldKind::Capability(_) => "capability",
            FieldKind::OwnedRef(_) => "owned",
            FieldKind::Shared(_) => "shared",
            FieldKind::Composite(_) => "composite",
            FieldKind::Container(_) => "container",
        }
    }
}

fn reference_field<T: 'static, F: ?Sized + Send + Sync + 'static>(
    accessor: FieldAccessor<T, Option<InstancePtr<F>>>,
) -> ReferenceField<T> {
    ReferenceField {
        type_key: TypeKey::of::<F>(),
        assign: Box::new(move |target: &mut T, binding: Option<&Binding>| {
            *accessor(target) = match binding {
                Some(binding) => Some(binding.instance::<F>().ok_or_else(|| {
                    ResolutionError::IncompatibleBinding {
                        expected: type_name::<F>(),
                        found: binding.type_key().name(),
                    }
                })?),
                None => None,
            };

            Ok(())
        }),
    }
}

fn construct<F: Injectable>(injector: &Injector<'_>) -> Result<Binding, InjectError> {
    injector
        .create::<F>()
        .map(|instance| Binding::new(InstancePtr::new(instance)))
}

/// A single injectable field.
pub struct FieldDescriptor<T> {
    name: &'static str,
    metadata: FieldMetadata,
    kind: FieldKind<T>,
}

impl<T> FieldDescriptor<T> {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    #[inline]
    pub fn kind(&self) -> &FieldKind<T> {
        &self.kind
    }
}

impl<T: 'static> Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .field("kind", &self.kind.shape())
            .finish()
    }
}

/// Injection schema of `T`. Fields are injected in declaration order.
pub struct Schema<T> {
    owner: &'static str,
    fields: Vec<FieldDescriptor<T>>,
    init: Option<fn(&mut T)>,
}

impl<T> Schema<T> {
    /// Name of the described type.
    #[inline]
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    /// Runs the post-injection hook, if the type has one.
    #[inline]
    pub fn init(&self, target: &mut T) {
        if let Some(init) = self.init {
            init(target);
        }
    }

    #[inline]
    pub fn has_init(&self) -> bool {
        self.init.is_some()
    }
}

impl<T: 'static> Debug for Schema<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("owner", &self.owner)
            .field("fields", &self.fields)
            .field("init", &self.init.is_some())
            .finish()
    }
}

fn validate<T: 'static>(metadata: &FieldMetadata, kind: &FieldKind<T>) -> Result<(), ResolutionError> {
    let unsupported = |key: &'static str| ResolutionError::UnsupportedKey {
        key,
        shape: kind.shape(),
    };

    if matches!(kind, FieldKind::Scalar(_)) {
        return Ok(());
    }

    if metadata.value().is_some() {
        return Err(unsupported(VALUE));
    }

    if metadata.default_value().is_some() && !metadata.is_zero_default() {
        return Err(unsupported(DEFAULT));
    }

    if metadata.is_private() && !matches!(kind, FieldKind::OwnedRef(_)) {
        return Err(unsupported(TYPE));
    }

    Ok(())
}

/// Picks the kind of an `Option<InstancePtr<F>>` field: [FieldKind::owned] when `F` is
/// [Injectable], [FieldKind::shared] otherwise. Call `select()` on a reference to it with
/// [SelectOwned] and [SelectShared] in scope.
#[doc(hidden)]
pub struct ReferenceSelector<T, F>(FieldAccessor<T, Option<InstancePtr<F>>>);

impl<T, F> ReferenceSelector<T, F> {
    pub fn new(accessor: FieldAccessor<T, Option<InstancePtr<F>>>) -> Self {
        Self(accessor)
    }
}

#[doc(hidden)]
pub trait SelectOwned<T> {
    fn select(&self) -> FieldKind<T>;
}

impl<T: 'static, F: Injectable> SelectOwned<T> for ReferenceSelector<T, F> {
    fn select(&self) -> FieldKind<T> {
        FieldKind::owned(self.0)
    }
}

#[doc(hidden)]
pub trait SelectShared<T> {
    fn select(&self) -> FieldKind<T>;
}

impl<T: 'static, F: Send + Sync + 'static> SelectShared<T> for &ReferenceSelector<T, F> {
    fn select(&self) -> FieldKind<T> {
        FieldKind::shared(self.0)
    }
}

/// Picks the kind of a field which is neither a reference nor a known container:
/// [FieldKind::scalar] when `F` is a [Scalar] (e.g. behind a type alias), [FieldKind::composite]
/// otherwise. Used like [ReferenceSelector] with [SelectScalar] and [SelectComposite].
#[doc(hidden)]
pub struct ValueSelector<T, F>(FieldAccessor<T, F>);

impl<T, F> ValueSelector<T, F> {
    pub fn new(accessor: FieldAccessor<T, F>) -> Self {
        Self(accessor)
    }
}

#[doc(hidden)]
pub trait SelectScalar<T> {
    fn select(&self) -> FieldKind<T>;
}

impl<T: 'static, F: Scalar> SelectScalar<T> for ValueSelector<T, F> {
    fn select(&self) -> FieldKind<T> {
        FieldKind::scalar(self.0)
    }
}

#[doc(hidden)]
pub trait SelectComposite<T> {
    fn select(&self) -> FieldKind<T>;
}

impl<T: 'static, F: Injectable> SelectComposite<T> for &ValueSelector<T, F> {
    fn select(&self) -> FieldKind<T> {
        FieldKind::composite(self.0)
    }
}

/// Builder for [Schema]s. Annotations are parsed eagerly and the first malformed one is
/// reported by [SchemaBuilder::build].
pub struct SchemaBuilder<T> {
    fields: Vec<FieldDescriptor<T>>,
    init: Option<fn(&mut T)>,
    error: Option<InjectError>,
}

impl<T: 'static> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> SchemaBuilder<T> {
    pub fn new() -> Self {
        Self {
            fields: vec![],
            init: None,
            error: None,
        }
    }

    /// Adds a field with given annotation. Value keys are only allowed on scalar fields and
    /// `type='private'` only on fields which can construct their instance.
    pub fn field(mut self, name: &'static str, annotation: &str, kind: FieldKind<T>) -> Self {
        if self.error.is_some() {
            return self;
        }

        let result = parse(annotation)
            .map_err(ResolutionError::from)
            .and_then(|metadata| validate(&metadata, &kind).map(|_| metadata));

        match result {
            Ok(metadata) => self.fields.push(FieldDescriptor {
                name,
                metadata,
                kind,
            }),
            Err(reason) => {
                self.error = Some(InjectError::Field {
                    owner: type_name::<T>(),
                    field: name,
                    reason,
                })
            }
        }

        self
    }

    /// Calls [Initializable::init] after injection.
    pub fn with_init(mut self) -> Self
    where
        T: Initializable,
    {
        self.init = Some(T::init);
        self
    }

    pub fn build(self) -> Result<Schema<T>, InjectError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(Schema {
                owner: type_name::<T>(),
                fields: self.fields,
                init: self.init,
            }),
        }
    }
}
