use wicket::application::ApplicationBuilder;
use wicket::runner::{ApplicationRunner, ErrorPtr};
use wicket_di::Injectable;

// this is an application runner, which will run after all auto factories have started
#[derive(Injectable, Default)]
struct HelloWorldRunner {
    // resolved from application.yml, config/application.yml or WICKET_GREETING
    #[inject("value='${greeting:Hello world!}'")]
    greeting: String,
}

impl ApplicationRunner for HelloWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("{}", self.greeting);
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let mut application = ApplicationBuilder::default()
        .with_registered_factories()
        .with_runner(HelloWorldRunner::default())
        .build()
        .expect("unable to create application");

    // prints "Hello world!"
    application.run().expect("error running application");
}
