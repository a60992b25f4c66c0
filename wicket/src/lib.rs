//! Application framework based on [wicket_di] dependency injection.
//!
//! An [Application](application::Application) bootstraps a DI
//! [Container](wicket_di::container::Container) with the [Environment](config::Environment),
//! starts [AutoFactories](factory::AutoFactory) in priority order, runs
//! [ApplicationRunners](runner::ApplicationRunner) and finally shuts everything down in reverse
//! order. Along the way it installs a `tracing` logger configured by
//! [ApplicationConfig](config::ApplicationConfig).
//!
//! ```
//! use wicket::application::ApplicationBuilder;
//! use wicket::config::ApplicationConfig;
//! use wicket::runner::{ApplicationRunner, ErrorPtr};
//! use wicket_di::Injectable;
//!
//! #[derive(Injectable, Default)]
//! struct Greeter {
//!     #[inject("value='${greeting:Hello}'")]
//!     greeting: String,
//! }
//!
//! impl ApplicationRunner for Greeter {
//!     fn run(&self) -> Result<(), ErrorPtr> {
//!         assert_eq!(self.greeting, "Hello");
//!         Ok(())
//!     }
//! }
//!
//! let mut application = ApplicationBuilder::default()
//!     .with_runner(Greeter::default())
//!     .build()
//!     .expect("error creating application");
//!
//! application.run().expect("error running application");
//! ```

pub mod application;
pub mod config;
pub mod factory;
pub mod runner;
