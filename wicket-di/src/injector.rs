//! The [Injector] populates [Injectable] types by walking their [Schema](crate::schema::Schema)
//! and resolving every annotated field against an [InstanceProvider] and a [ValueResolver].
//!
//! Scalar fields resolve their value in the following order:
//!
//! 1. a literal `value`,
//! 2. a `${key}` placeholder resolved by the [ValueResolver],
//! 3. the inline placeholder default from `${key:default}`,
//! 4. the `default` key.
//!
//! Reference fields are looked up by `name` first, then by type. Missing owned references are
//! created and published, so every other field referencing the same type shares the instance.
//! References to types which are not [Injectable] are never created; they must be registered
//! upfront, e.g. by an auto factory.

use crate::component::{DynInjectable, Injectable};
use crate::error::{ConversionError, InjectError, ResolutionError};
use crate::instance_provider::InstanceProvider;
use crate::metadata::FieldMetadata;
use crate::registry::{Binding, BindingOrigin, TypeKey};
use crate::schema::{FieldDescriptor, FieldKind};
use crate::value::coerce;
use std::collections::HashMap;
use std::hash::BuildHasher;
use tracing::debug;

/// Source of values for `${...}` placeholders. Supplied externally; the container never stores
/// it.
pub trait ValueResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Option<String>;
}

impl<S: BuildHasher + Send + Sync> ValueResolver for HashMap<String, String, S> {
    #[inline]
    fn resolve(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Resolver without any values.
#[derive(Clone, Copy, Default, Debug)]
pub struct EmptyResolver;

impl ValueResolver for EmptyResolver {
    #[inline]
    fn resolve(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Splits a `${key}` or `${key:default}` placeholder into the key and the optional default.
/// Returns `None` if given value is not a placeholder.
pub fn parse_placeholder(value: &str) -> Option<(&str, Option<&str>)> {
    let body = value.strip_prefix("${")?.strip_suffix('}')?;
    Some(match body.split_once(':') {
        Some((key, default)) => (key, Some(default)),
        None => (body, None),
    })
}

enum Lookup {
    Found(Binding),
    Zero,
    Missing,
}

/// Populates injectable types. Errors abort injection of the whole object graph; fields which
/// were already set keep their values.
#[derive(Clone, Copy)]
pub struct Injector<'a> {
    provider: &'a dyn InstanceProvider,
    resolver: &'a dyn ValueResolver,
}

impl<'a> Injector<'a> {
    pub fn new(provider: &'a dyn InstanceProvider, resolver: &'a dyn ValueResolver) -> Self {
        Self { provider, resolver }
    }

    /// Creates a new instance with all fields injected.
    pub fn create<T: Injectable>(&self) -> Result<T, InjectError> {
        let mut instance = T::default();
        self.inject(&mut instance)?;
        Ok(instance)
    }

    /// Injects all annotated fields of given target and runs its init hook.
    pub fn inject<T: Injectable>(&self, target: &mut T) -> Result<(), InjectError> {
        let Some(schema) = T::schema()? else {
            return Ok(());
        };

        debug!(owner = schema.owner(), "Injecting fields");

        for field in schema.fields() {
            self.inject_field(schema.owner(), field, target)?;
        }

        if schema.has_init() {
            debug!(owner = schema.owner(), "Running init hook");
            schema.init(target);
        }

        Ok(())
    }

    /// Type-erased version of [Injector::inject].
    #[inline]
    pub fn inject_dyn(&self, target: &mut dyn DynInjectable) -> Result<(), InjectError> {
        target.inject_with(self)
    }

    fn inject_field<T: 'static>(
        &self,
        owner: &'static str,
        field: &FieldDescriptor<T>,
        target: &mut T,
    ) -> Result<(), InjectError> {
        let field_error = |reason: ResolutionError| InjectError::Field {
            owner,
            field: field.name(),
            reason,
        };

        let metadata = field.metadata();
        match field.kind() {
            FieldKind::Scalar(scalar) => {
                let Some(literal) = self.resolve_literal(metadata).map_err(field_error)? else {
                    debug!(owner, field = field.name(), "Keeping zero value");
                    return Ok(());
                };

                let value = coerce(&literal, scalar.kind())
                    .map_err(|error| field_error(error.into()))?;

                debug!(owner, field = field.name(), literal = %literal, "Injecting value");

                if !scalar.assign(target, value) {
                    return Err(field_error(
                        ConversionError {
                            literal,
                            kind: scalar.kind(),
                        }
                        .into(),
                    ));
                }
            }
            FieldKind::Capability(reference) | FieldKind::Shared(reference) => {
                let binding = match self.lookup(metadata, reference.type_key()) {
                    Lookup::Found(binding) => Some(binding),
                    Lookup::Missing if !metadata.is_zero_default() => {
                        return Err(field_error(ResolutionError::BindingNotFound {
                            name: metadata.name().map(str::to_string),
                            type_name: reference.type_key().name(),
                        }));
                    }
                    Lookup::Zero | Lookup::Missing => {
                        debug!(owner, field = field.name(), "Reference not bound, leaving empty");
                        None
                    }
                };

                reference
                    .assign(target, binding.as_ref())
                    .map_err(field_error)?;
            }
            FieldKind::OwnedRef(owned) => {
                let reference = owned.reference();
                let binding = if metadata.is_private() {
                    debug!(owner, field = field.name(), "Creating private instance");
                    Some(owned.construct(self)?)
                } else {
                    match self.lookup(metadata, reference.type_key()) {
                        Lookup::Found(binding) => Some(binding),
                        Lookup::Zero => None,
                        Lookup::Missing => {
                            debug!(
                                owner,
                                field = field.name(),
                                type_name = reference.type_key().name(),
                                "Creating shared instance"
                            );

                            let binding = owned.construct(self)?;
                            self.publish(metadata, reference.type_key(), binding)
                                .map_err(field_error)?
                        }
                    }
                };

                reference
                    .assign(target, binding.as_ref())
                    .map_err(field_error)?;
            }
            FieldKind::Composite(inject) => {
                debug!(owner, field = field.name(), "Creating composite value");
                inject(target, self)?;
            }
            FieldKind::Container(reset) => reset(target),
        }

        Ok(())
    }

    /// Returns `None` for `default='zero'` when nothing else matched.
    fn resolve_literal(&self, metadata: &FieldMetadata) -> Result<Option<String>, ResolutionError> {
        if let Some(value) = metadata.value() {
            match parse_placeholder(value) {
                Some((key, inline_default)) => {
                    if let Some(resolved) = self.resolver.resolve(key) {
                        return Ok(Some(resolved));
                    }

                    if let Some(inline_default) = inline_default {
                        return Ok(Some(inline_default.to_string()));
                    }
                }
                None => return Ok(Some(value.to_string())),
            }
        }

        match metadata.default_value() {
            _ if metadata.is_zero_default() => Ok(None),
            Some(default) => Ok(Some(default.to_string())),
            None => Err(ResolutionError::ResolutionFailed(
                metadata
                    .value()
                    .or_else(|| metadata.tag())
                    .unwrap_or_default()
                    .to_string(),
            )),
        }
    }

    fn lookup(&self, metadata: &FieldMetadata, type_key: TypeKey) -> Lookup {
        if let Some(name) = metadata.name() {
            if let Some(binding) = self.provider.named(name) {
                return Lookup::Found(binding);
            }

            if metadata.is_zero_default() {
                return Lookup::Zero;
            }
        }

        self.provider
            .typed(type_key.id())
            .map(Lookup::Found)
            .unwrap_or(Lookup::Missing)
    }

    fn publish(
        &self,
        metadata: &FieldMetadata,
        type_key: TypeKey,
        binding: Binding,
    ) -> Result<Option<Binding>, ResolutionError> {
        let binding = binding.with_origin(BindingOrigin::Injector);

        if let Some(name) = metadata.name() {
            self.provider.register_named(name, binding.clone())?;
        }

        self.provider.register_typed(type_key, binding.clone())?;
        Ok(Some(binding))
    }
}

#[cfg(test)]
mod tests {
    use crate::component::{Initializable, Injectable};
    use crate::error::{InjectError, RegistryError, ResolutionError};
    use crate::injector::{parse_placeholder, EmptyResolver, Injector, ValueResolver};
    use crate::instance_provider::{InstancePtr, MockInstanceProvider};
    use crate::registry::{Binding, BindingKey, BindingOrigin, TypeKey};
    use crate::schema::{FieldKind, Schema, SchemaBuilder};
    use mockall::predicate::*;
    use std::any::TypeId;
    use std::collections::HashMap;
    use std::sync::OnceLock;

    trait Storage: Send + Sync {
        fn id(&self) -> i8;
    }

    struct TestStorage(i8);

    impl Storage for TestStorage {
        fn id(&self) -> i8 {
            self.0
        }
    }

    macro_rules! schema {
        ($ty:ty, $builder:expr) => {
            fn schema() -> Result<Option<&'static Schema<Self>>, InjectError> {
                static SCHEMA: OnceLock<Result<Schema<$ty>, InjectError>> = OnceLock::new();
                SCHEMA
                    .get_or_init(|| $builder)
                    .as_ref()
                    .map(Some)
                    .map_err(Clone::clone)
            }
        };
    }

    #[derive(Default, Debug)]
    struct Values {
        port: u16,
        name: String,
        ratio: f64,
        enabled: bool,
    }

    fn port(target: &mut Values) -> &mut u16 {
        &mut target.port
    }

    fn name(target: &mut Values) -> &mut String {
        &mut target.name
    }

    fn ratio(target: &mut Values) -> &mut f64 {
        &mut target.ratio
    }

    fn enabled(target: &mut Values) -> &mut bool {
        &mut target.enabled
    }

    impl Injectable for Values {
        schema!(
            Values,
            SchemaBuilder::new()
                .field("port", "value='${server.port:8080}'", FieldKind::scalar(port))
                .field("name", "value='${app.name}',default='app'", FieldKind::scalar(name))
                .field("ratio", "value='0.5'", FieldKind::scalar(ratio))
                .field("enabled", "default='zero'", FieldKind::scalar(enabled))
                .build()
        );
    }

    #[derive(Default, Debug)]
    struct Required {
        value: i32,
    }

    fn required_value(target: &mut Required) -> &mut i32 {
        &mut target.value
    }

    impl Injectable for Required {
        schema!(
            Required,
            SchemaBuilder::new()
                .field("value", "value='${a.b.c}'", FieldKind::scalar(required_value))
                .build()
        );
    }

    #[derive(Default)]
    struct WithStorage {
        storage: Option<InstancePtr<dyn Storage>>,
    }

    fn storage(target: &mut WithStorage) -> &mut Option<InstancePtr<dyn Storage>> {
        &mut target.storage
    }

    impl Injectable for WithStorage {
        schema!(
            WithStorage,
            SchemaBuilder::new()
                .field("storage", "name='abc',default='zero'", FieldKind::capability(storage))
                .build()
        );
    }

    #[derive(Default)]
    struct RequiredStorage {
        storage: Option<InstancePtr<dyn Storage>>,
    }

    fn required_storage(target: &mut RequiredStorage) -> &mut Option<InstancePtr<dyn Storage>> {
        &mut target.storage
    }

    impl std::fmt::Debug for RequiredStorage {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RequiredStorage").finish_non_exhaustive()
        }
    }

    impl Injectable for RequiredStorage {
        schema!(
            RequiredStorage,
            SchemaBuilder::new()
                .field("storage", "", FieldKind::capability(required_storage))
                .build()
        );
    }

    #[derive(Default, Debug)]
    struct Owner {
        shared: Option<InstancePtr<Values>>,
        private: Option<InstancePtr<Values>>,
        local: Values,
        list: Vec<u8>,
        initialized: usize,
    }

    fn shared(target: &mut Owner) -> &mut Option<InstancePtr<Values>> {
        &mut target.shared
    }

    fn private(target: &mut Owner) -> &mut Option<InstancePtr<Values>> {
        &mut target.private
    }

    fn local(target: &mut Owner) -> &mut Values {
        &mut target.local
    }

    fn list(target: &mut Owner) -> &mut Vec<u8> {
        &mut target.list
    }

    impl Initializable for Owner {
        fn init(&mut self) {
            self.initialized += 1;
        }
    }

    impl Injectable for Owner {
        schema!(
            Owner,
            SchemaBuilder::new()
                .field("shared", "name='values'", FieldKind::owned(shared))
                .field("private", "type='private'", FieldKind::owned(private))
                .field("local", "", FieldKind::composite(local))
                .field("list", "", FieldKind::container(list))
                .with_init()
                .build()
        );
    }

    #[derive(Debug)]
    struct Handle(u8);

    #[derive(Default, Debug)]
    struct WithHandle {
        handle: Option<InstancePtr<Handle>>,
        optional: Option<InstancePtr<Handle>>,
    }

    fn handle(target: &mut WithHandle) -> &mut Option<InstancePtr<Handle>> {
        &mut target.handle
    }

    fn optional_handle(target: &mut WithHandle) -> &mut Option<InstancePtr<Handle>> {
        &mut target.optional
    }

    impl Injectable for WithHandle {
        schema!(
            WithHandle,
            SchemaBuilder::new()
                .field("handle", "name='handle'", FieldKind::shared(handle))
                .field(
                    "optional",
                    "name='other',default='zero'",
                    FieldKind::shared(optional_handle)
                )
                .build()
        );
    }

    fn resolver(values: &[(&str, &str)]) -> HashMap<String, String> {
        values
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn should_parse_placeholders() {
        assert_eq!(parse_placeholder("${a.b}"), Some(("a.b", None)));
        assert_eq!(parse_placeholder("${a:1}"), Some(("a", Some("1"))));
        assert_eq!(parse_placeholder("${a:b:c}"), Some(("a", Some("b:c"))));
        assert_eq!(parse_placeholder("${a:}"), Some(("a", Some(""))));
        assert_eq!(parse_placeholder("$a"), None);
        assert_eq!(parse_placeholder("${a"), None);
        assert_eq!(parse_placeholder("a}"), None);
    }

    #[test]
    fn should_inject_scalar_values() {
        let provider = MockInstanceProvider::new();
        let values = resolver(&[("server.port", "9000")]);

        let injected = Injector::new(&provider, &values).create::<Values>().unwrap();

        assert_eq!(injected.port, 9000);
        assert_eq!(injected.name, "app");
        assert_eq!(injected.ratio, 0.5);
        assert!(!injected.enabled);
    }

    #[test]
    fn should_prefer_resolved_value_over_defaults() {
        let provider = MockInstanceProvider::new();
        let values = resolver(&[("app.name", "resolved")]);

        let injected = Injector::new(&provider, &values).create::<Values>().unwrap();

        assert_eq!(injected.port, 8080);
        assert_eq!(injected.name, "resolved");
    }

    #[test]
    fn should_resolve_nested_key() {
        let provider = MockInstanceProvider::new();
        let values = resolver(&[("a.b.c", "123")]);

        let injected = Injector::new(&provider, &values)
            .create::<Required>()
            .unwrap();

        assert_eq!(injected.value, 123);
    }

    #[test]
    fn should_fail_on_missing_value_without_default() {
        let provider = MockInstanceProvider::new();

        let error = Injector::new(&provider, &EmptyResolver)
            .create::<Required>()
            .unwrap_err();

        assert_eq!(
            error,
            InjectError::Field {
                owner: std::any::type_name::<Required>(),
                field: "value",
                reason: ResolutionError::ResolutionFailed("${a.b.c}".to_string()),
            }
        );
    }

    #[test]
    fn should_fail_on_invalid_value() {
        let provider = MockInstanceProvider::new();
        let values = resolver(&[("a.b.c", "abc")]);

        let error = Injector::new(&provider, &values)
            .create::<Required>()
            .unwrap_err();

        assert!(matches!(
            error.reason(),
            Some(ResolutionError::Conversion(_))
        ));
    }

    #[test]
    fn should_leave_missing_zero_capability_empty() {
        let mut provider = MockInstanceProvider::new();
        provider.expect_named().with(eq("abc")).returning(|_| None);
        provider.expect_typed().never();

        let injected = Injector::new(&provider, &EmptyResolver)
            .create::<WithStorage>()
            .unwrap();

        assert!(injected.storage.is_none());
    }

    #[test]
    fn should_inject_named_capability() {
        let mut provider = MockInstanceProvider::new();
        provider.expect_named().with(eq("abc")).returning(|_| {
            Some(Binding::new(
                InstancePtr::new(TestStorage(3)) as InstancePtr<dyn Storage>
            ))
        });

        let injected = Injector::new(&provider, &EmptyResolver)
            .create::<WithStorage>()
            .unwrap();

        assert_eq!(injected.storage.unwrap().id(), 3);
    }

    #[test]
    fn should_inject_typed_capability() {
        let mut provider = MockInstanceProvider::new();
        provider
            .expect_typed()
            .with(eq(TypeId::of::<dyn Storage>()))
            .returning(|_| {
                Some(Binding::new(
                    InstancePtr::new(TestStorage(4)) as InstancePtr<dyn Storage>
                ))
            });

        let injected = Injector::new(&provider, &EmptyResolver)
            .create::<RequiredStorage>()
            .unwrap();

        assert_eq!(injected.storage.unwrap().id(), 4);
    }

    #[test]
    fn should_fail_on_missing_capability() {
        let mut provider = MockInstanceProvider::new();
        provider.expect_typed().returning(|_| None);

        let error = Injector::new(&provider, &EmptyResolver)
            .create::<RequiredStorage>()
            .unwrap_err();

        assert!(matches!(
            error.reason(),
            Some(ResolutionError::BindingNotFound { name: None, .. })
        ));
    }

    #[test]
    fn should_fail_on_incompatible_capability() {
        let mut provider = MockInstanceProvider::new();
        provider
            .expect_typed()
            .returning(|_| Some(Binding::new(InstancePtr::new(TestStorage(1)))));

        let error = Injector::new(&provider, &EmptyResolver)
            .create::<RequiredStorage>()
            .unwrap_err();

        assert!(matches!(
            error.reason(),
            Some(ResolutionError::IncompatibleBinding { .. })
        ));
    }

    #[test]
    fn should_create_and_publish_owned_references() {
        let mut provider = MockInstanceProvider::new();
        provider.expect_named().with(eq("values")).returning(|_| None);
        provider
            .expect_typed()
            .with(eq(TypeId::of::<Values>()))
            .returning(|_| None);
        provider
            .expect_register_named()
            .withf(|name, binding| {
                name == "values" && binding.origin() == BindingOrigin::Injector
            })
            .times(1)
            .returning(|_, _| Ok(()));
        provider
            .expect_register_typed()
            .withf(|type_key, _| *type_key == TypeKey::of::<Values>())
            .times(1)
            .returning(|_, _| Ok(()));

        let injected = Injector::new(&provider, &EmptyResolver)
            .create::<Owner>()
            .unwrap();

        let shared = injected.shared.unwrap();
        let private = injected.private.unwrap();
        assert!(!InstancePtr::ptr_eq(&shared, &private));
        assert_eq!(shared.port, 8080);
        assert_eq!(private.port, 8080);
        assert_eq!(injected.local.port, 8080);
        assert!(injected.list.is_empty());
        assert_eq!(injected.initialized, 1);
    }

    #[test]
    fn should_reuse_registered_owned_reference() {
        let existing = InstancePtr::new(Values {
            port: 1,
            ..Values::default()
        });

        let mut provider = MockInstanceProvider::new();
        let binding = Binding::new(existing.clone());
        provider
            .expect_named()
            .with(eq("values"))
            .returning(move |_| Some(binding.clone()));
        provider.expect_register_named().never();
        provider.expect_register_typed().never();

        let injected = Injector::new(&provider, &EmptyResolver)
            .create::<Owner>()
            .unwrap();

        assert!(InstancePtr::ptr_eq(&injected.shared.unwrap(), &existing));
    }

    #[test]
    fn should_propagate_duplicate_publication() {
        let mut provider = MockInstanceProvider::new();
        provider.expect_named().returning(|_| None);
        provider.expect_typed().returning(|_| None);
        provider.expect_register_named().returning(|name, _| {
            Err(RegistryError::DuplicateBinding(BindingKey::Name(
                name.to_string(),
            )))
        });

        let error = Injector::new(&provider, &EmptyResolver)
            .create::<Owner>()
            .unwrap_err();

        assert!(matches!(
            error,
            InjectError::Field {
                field: "shared",
                reason: ResolutionError::Registry(RegistryError::DuplicateBinding(_)),
                ..
            }
        ));
    }

    #[test]
    fn should_treat_leaf_types_as_injected() {
        let provider = MockInstanceProvider::new();
        let injector = Injector::new(&provider, &EmptyResolver);

        let mut value = 5u8;
        injector.inject(&mut value).unwrap();
        assert_eq!(value, 5);

        let mut list = vec![1, 2];
        injector.inject_dyn(&mut list).unwrap();
        assert_eq!(list, vec![1, 2]);
    }

    #[test]
    fn should_resolve_through_custom_resolver() {
        struct Upper;

        impl ValueResolver for Upper {
            fn resolve(&self, key: &str) -> Option<String> {
                (key == "app.name").then(|| "UPPER".to_string())
            }
        }

        let provider = MockInstanceProvider::new();
        let injected = Injector::new(&provider, &Upper).create::<Values>().unwrap();

        assert_eq!(injected.name, "UPPER");
    }

    #[test]
    fn should_look_up_shared_references_without_creating() {
        let mut provider = MockInstanceProvider::new();
        provider
            .expect_named()
            .with(eq("handle"))
            .returning(|_| Some(Binding::new(InstancePtr::new(Handle(7)))));
        provider.expect_named().with(eq("other")).returning(|_| None);
        provider.expect_register_named().never();
        provider.expect_register_typed().never();

        let injected = Injector::new(&provider, &EmptyResolver)
            .create::<WithHandle>()
            .unwrap();

        assert_eq!(injected.handle.unwrap().0, 7);
        assert!(injected.optional.is_none());
    }

    #[test]
    fn should_fail_on_missing_shared_reference() {
        let mut provider = MockInstanceProvider::new();
        provider.expect_named().returning(|_| None);
        provider
            .expect_typed()
            .with(eq(TypeId::of::<Handle>()))
            .returning(|_| None);
        provider.expect_register_named().never();
        provider.expect_register_typed().never();

        let error = Injector::new(&provider, &EmptyResolver)
            .create::<WithHandle>()
            .unwrap_err();

        assert!(matches!(
            error,
            InjectError::Field {
                field: "handle",
                reason: ResolutionError::BindingNotFound { name: Some(ref name), .. },
                ..
            } if name == "handle"
        ));
    }
}
