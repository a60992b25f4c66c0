#[cfg(feature = "derive")]
mod injectable_derive_test {
    use std::collections::HashMap;
    use wicket_di::component::Initializable;
    use wicket_di::container::Container;
    use wicket_di::error::{InjectError, ResolutionError};
    use wicket_di::injector::EmptyResolver;
    use wicket_di::instance_provider::{InstanceProvider, InstancePtr, TypedInstanceProvider};
    use wicket_di::registry::{Binding, BindingOrigin};
    use wicket_di::value::Complex64;
    use wicket_di::Injectable;

    trait Storage: Send + Sync {
        fn url(&self) -> &str;
    }

    struct MemoryStorage;

    impl Storage for MemoryStorage {
        fn url(&self) -> &str {
            "memory://"
        }
    }

    #[derive(Injectable, Default, Debug, PartialEq)]
    struct Scalars {
        #[inject("value='${missing:9}'")]
        with_inline_default: i64,
        #[inject("value='${a.b.c}'")]
        resolved: u32,
        #[inject("value='${flag}',default='false'")]
        flag: bool,
        #[inject("value='(1+2i)'")]
        complex: Complex64,
        #[inject("value='plain'")]
        text: String,
        untouched: u8,
    }

    #[derive(Injectable, Default, Debug)]
    struct MissingValue {
        #[inject("value='${missing}'")]
        _value: i32,
    }

    #[derive(Injectable, Default, Debug)]
    struct Malformed {
        #[inject("value=oops")]
        _value: i32,
    }

    #[derive(Injectable, Default)]
    struct OptionalStorage {
        #[inject("name='abc',default='zero'")]
        storage: Option<InstancePtr<dyn Storage>>,
    }

    #[derive(Injectable, Default)]
    struct RequiredStorage {
        #[inject]
        storage: Option<InstancePtr<dyn Storage>>,
    }

    impl std::fmt::Debug for RequiredStorage {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RequiredStorage").finish_non_exhaustive()
        }
    }

    #[derive(Injectable, Default, Debug)]
    #[inject(init)]
    struct Pool {
        #[inject("value='${pool.size:4}'")]
        size: u16,
        doubled: u16,
        initialized: u8,
    }

    impl Initializable for Pool {
        fn init(&mut self) {
            self.initialized += 1;
            self.doubled = self.size * 2;
        }
    }

    #[derive(Injectable, Default)]
    struct Repository {
        #[inject("name='pool'")]
        pool: Option<InstancePtr<Pool>>,
    }

    #[derive(Injectable, Default)]
    struct Service {
        #[inject]
        repository: Repository,
        #[inject]
        pool: Option<InstancePtr<Pool>>,
        #[inject("type='private'")]
        private_pool: Option<InstancePtr<Pool>>,
        #[inject]
        cache: HashMap<String, String>,
        #[inject]
        tags: Vec<String>,
    }

    #[derive(Debug)]
    struct Client {
        url: String,
    }

    #[derive(Injectable, Default, Debug)]
    struct Consumer {
        #[inject("name='client'")]
        named: Option<InstancePtr<Client>>,
        #[inject]
        typed: Option<InstancePtr<Client>>,
        #[inject("name='backup',default='zero'")]
        backup: Option<InstancePtr<Client>>,
    }

    type Port = u16;

    #[derive(Injectable, Default)]
    struct Server {
        #[inject("value='${server.port:7}'")]
        port: Port,
    }

    #[derive(Injectable, Default, Debug)]
    struct RequiredPort {
        #[inject("value='${server.port}'")]
        _port: Port,
    }

    #[derive(Injectable, Default, Debug)]
    struct ValueOnComposite {
        #[inject("value='${pool.size}'")]
        _pool: Pool,
    }

    #[derive(Injectable, Default)]
    struct Tuple(#[inject("value='7'")] u8, u8);

    #[derive(Injectable, Default, Debug)]
    struct Outer {
        #[inject]
        _inner: MissingValue,
    }

    fn values(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn should_inject_scalars() {
        let container = Container::new();
        let resolver = values(&[("a.b.c", "123")]);

        let scalars: Scalars = container.create(&resolver).unwrap();

        assert_eq!(scalars.with_inline_default, 9);
        assert_eq!(scalars.resolved, 123);
        assert!(!scalars.flag);
        assert_eq!(scalars.complex, Complex64::new(1.0, 2.0));
        assert_eq!(scalars.text, "plain");
        assert_eq!(scalars.untouched, 0);
    }

    #[test]
    fn should_inject_deterministically() {
        let container = Container::new();
        let resolver = values(&[("a.b.c", "5"), ("flag", "T")]);

        let first: Scalars = container.create(&resolver).unwrap();
        let second: Scalars = container.create(&resolver).unwrap();

        assert_eq!(first, second);
        assert!(first.flag);
    }

    #[test]
    fn should_fail_on_missing_placeholder() {
        let container = Container::new();

        let error = container
            .create::<MissingValue>(&EmptyResolver)
            .unwrap_err();

        assert_eq!(
            error.reason(),
            Some(&ResolutionError::ResolutionFailed("${missing}".to_string()))
        );
    }

    #[test]
    fn should_report_malformed_annotation() {
        let container = Container::new();

        let error = container.create::<Malformed>(&EmptyResolver).unwrap_err();

        assert!(matches!(
            error,
            InjectError::Field {
                field: "_value",
                reason: ResolutionError::Syntax(_),
                ..
            }
        ));
    }

    #[test]
    fn should_propagate_nested_errors_unchanged() {
        let container = Container::new();

        let error = container.create::<Outer>(&EmptyResolver).unwrap_err();

        assert!(matches!(
            error,
            InjectError::Field { owner, field: "_value", .. } if owner.ends_with("MissingValue")
        ));
    }

    #[test]
    fn should_leave_missing_zero_capability_empty() {
        let container = Container::new();

        let injected: OptionalStorage = container.create(&EmptyResolver).unwrap();

        assert!(injected.storage.is_none());
    }

    #[test]
    fn should_inject_named_capability() {
        let container = Container::new();
        container
            .register_named(
                "abc",
                Binding::new(InstancePtr::new(MemoryStorage) as InstancePtr<dyn Storage>),
            )
            .unwrap();

        let injected: OptionalStorage = container.create(&EmptyResolver).unwrap();

        assert_eq!(injected.storage.unwrap().url(), "memory://");
    }

    #[test]
    fn should_require_unnamed_capability() {
        let container = Container::new();

        let error = container
            .create::<RequiredStorage>(&EmptyResolver)
            .unwrap_err();
        assert!(matches!(
            error.reason(),
            Some(ResolutionError::BindingNotFound { .. })
        ));

        container
            .register_instance(InstancePtr::new(MemoryStorage) as InstancePtr<dyn Storage>)
            .unwrap();

        let injected: RequiredStorage = container.create(&EmptyResolver).unwrap();
        assert!(injected.storage.is_some());
    }

    #[test]
    fn should_share_published_instances() {
        let container = Container::new();
        let resolver = values(&[("pool.size", "8")]);

        let service: Service = container.create(&resolver).unwrap();

        let named = service.repository.pool.unwrap();
        let typed = service.pool.unwrap();
        let private = service.private_pool.unwrap();

        assert!(InstancePtr::ptr_eq(&named, &typed));
        assert!(!InstancePtr::ptr_eq(&named, &private));
        assert_eq!(named.size, 8);
        assert_eq!(named.doubled, 16);
        assert_eq!(private.doubled, 16);
        assert!(service.cache.is_empty());
        assert!(service.tags.is_empty());

        let published = container.named("pool").unwrap();
        assert_eq!(published.origin(), BindingOrigin::Injector);
        assert!(InstancePtr::ptr_eq(
            &container.instance_typed::<Pool>().unwrap(),
            &named
        ));
    }

    #[test]
    fn should_run_init_once_per_instance() {
        let container = Container::new();

        let created: Pool = container.create(&EmptyResolver).unwrap();
        assert_eq!(created.initialized, 1);

        let mut pool = Pool::default();
        container.inject(&EmptyResolver, &mut pool).unwrap();
        assert_eq!(pool.size, 4);
        assert_eq!(pool.doubled, 8);
        assert_eq!(pool.initialized, 1);

        let service: Service = container.create(&EmptyResolver).unwrap();
        assert_eq!(service.pool.unwrap().initialized, 1);
        assert_eq!(service.private_pool.unwrap().initialized, 1);
    }

    #[test]
    fn should_look_up_foreign_references_without_creating() {
        let container = Container::new();
        let client = InstancePtr::new(Client {
            url: "tcp://client".to_string(),
        });

        let error = container.create::<Consumer>(&EmptyResolver).unwrap_err();
        assert!(matches!(
            error,
            InjectError::Field {
                field: "named",
                reason: ResolutionError::BindingNotFound { .. },
                ..
            }
        ));
        assert!(!container.registry().contains_named("client"));

        container
            .register_named("client", Binding::new(client.clone()))
            .unwrap();
        container.register_instance(client.clone()).unwrap();

        let consumer: Consumer = container.create(&EmptyResolver).unwrap();

        assert!(InstancePtr::ptr_eq(&consumer.named.unwrap(), &client));
        assert_eq!(consumer.typed.unwrap().url, "tcp://client");
        assert!(consumer.backup.is_none());
    }

    #[test]
    fn should_inject_scalar_type_aliases() {
        let container = Container::new();

        let server: Server = container.create(&EmptyResolver).unwrap();
        assert_eq!(server.port, 7);

        let server: Server = container
            .create(&values(&[("server.port", "8080")]))
            .unwrap();
        assert_eq!(server.port, 8080);

        let error = container
            .create::<RequiredPort>(&EmptyResolver)
            .unwrap_err();
        assert_eq!(
            error.reason(),
            Some(&ResolutionError::ResolutionFailed("${server.port}".to_string()))
        );
    }

    #[test]
    fn should_reject_values_on_composite_fields() {
        let container = Container::new();
        let resolver = values(&[("pool.size", "8")]);

        let error = container
            .create::<ValueOnComposite>(&resolver)
            .unwrap_err();

        assert!(matches!(
            error,
            InjectError::Field {
                field: "_pool",
                reason: ResolutionError::UnsupportedKey { key: "value", .. },
                ..
            }
        ));
    }

    #[test]
    fn should_inject_tuple_structs() {
        let container = Container::new();

        let tuple: Tuple = container.create(&EmptyResolver).unwrap();

        assert_eq!(tuple.0, 7);
        assert_eq!(tuple.1, 0);
    }

    #[test]
    fn should_inject_trait_objects() {
        let container = Container::new();
        let mut service: Box<dyn wicket_di::component::DynInjectable> =
            Box::<Service>::default();

        container
            .inject_dyn(&EmptyResolver, service.as_mut())
            .unwrap();

        assert!(container.registry().contains_named("pool"));
    }
}
