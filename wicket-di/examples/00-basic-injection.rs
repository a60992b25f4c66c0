use std::collections::HashMap;
use wicket_di::container::Container;
use wicket_di::instance_provider::{InstancePtr, TypedInstanceProvider};
use wicket_di::Injectable;

// a capability, which can be implemented by many types
trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}!")
    }
}

// shared state, created lazily by the container on first use
#[derive(Injectable, Default)]
struct Counter {
    #[inject("value='${counter.start:0}'")]
    start: u32,
}

#[derive(Injectable, Default)]
struct Service {
    // injected from the resolver, with an inline default
    #[inject("value='${service.name:world}'")]
    name: String,
    // looked up by type
    #[inject]
    greeter: Option<InstancePtr<dyn Greeter>>,
    // created on first use and shared afterwards
    #[inject]
    counter: Option<InstancePtr<Counter>>,
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let container = Container::new();
    container
        .register_instance(InstancePtr::new(English) as InstancePtr<dyn Greeter>)
        .expect("error registering greeter");

    let values = HashMap::from([("counter.start".to_string(), "10".to_string())]);

    let service: Service = container
        .create(&values)
        .expect("error creating service");

    let greeter = service.greeter.expect("greeter should be injected");
    let counter = service.counter.expect("counter should be injected");

    // prints "Hello, world! (10)"
    println!("{} ({})", greeter.greet(&service.name), counter.start);
}
