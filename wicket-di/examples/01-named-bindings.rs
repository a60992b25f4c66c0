use wicket_di::container::Container;
use wicket_di::injector::EmptyResolver;
use wicket_di::instance_provider::{InstanceProvider, InstancePtr};
use wicket_di::registry::Binding;
use wicket_di::Injectable;

trait Storage: Send + Sync {
    fn url(&self) -> &str;
}

struct Database(&'static str);

impl Storage for Database {
    fn url(&self) -> &str {
        self.0
    }
}

#[derive(Injectable, Default)]
struct Repository {
    // selects a concrete binding by name
    #[inject("name='replica'")]
    storage: Option<InstancePtr<dyn Storage>>,
    // a missing binding leaves the field empty instead of failing
    #[inject("name='cache',default='zero'")]
    cache: Option<InstancePtr<dyn Storage>>,
}

fn main() {
    let container = Container::new();

    for (name, url) in [("primary", "db://primary"), ("replica", "db://replica")] {
        container
            .register_named(
                name,
                Binding::new(InstancePtr::new(Database(url)) as InstancePtr<dyn Storage>),
            )
            .expect("error registering storage");
    }

    let repository: Repository = container
        .create(&EmptyResolver)
        .expect("error creating repository");

    // prints "db://replica, cache: false"
    println!(
        "{}, cache: {}",
        repository.storage.map(|storage| storage.url().to_string()).unwrap_or_default(),
        repository.cache.is_some()
    );
}
