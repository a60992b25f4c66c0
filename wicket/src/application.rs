//! Core application framework functionality.
//!
//! An [Application] drives the following lifecycle:
//!
//! 1. bootstrap - registers the environment and [ApplicationConfig] in the container,
//! 2. startup - injects each auto factory in ascending priority order, checks its condition,
//!    starts it and publishes its bindings,
//! 3. runners - injects and runs [ApplicationRunners](crate::runner::ApplicationRunner),
//! 4. shutdown - runs shutdown hooks in reverse registration order, then stops started factories
//!    in reverse start order.
//!
//! Shutdown always runs, even if startup failed, and never stops at the first error.

use crate::config::{ApplicationConfig, Environment};
use crate::factory::{registered_factories, AutoFactoryPtr, ManagedFactory};
use crate::runner::{ApplicationRunnerPtr, ManagedRunner};
use derive_more::Constructor;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use wicket_di::container::Container;
use wicket_di::error::{InjectError, RegistryError};
use wicket_di::injector::ValueResolver;
use wicket_di::instance_provider::{
    ErrorPtr, InstanceProvider, InstancePtr, TypedInstanceProvider,
};
use wicket_di::registry::{Binding, BindingOrigin, TypeKey};

/// Name of the bootstrap `dyn ValueResolver` binding. Can be shadowed once by an auto factory.
pub const ENVIRONMENT: &str = "environment";

/// Name of the bootstrap [ApplicationConfig] binding.
pub const APPLICATION_CONFIG: &str = "application_config";

const BOOTSTRAP: &str = "bootstrap";

#[derive(Clone, Error, Debug)]
pub enum ApplicationError {
    #[error("Configuration error: {0}")]
    Config(ErrorPtr),
    #[error("Cannot inject {name}: {error}")]
    Injection { name: String, error: InjectError },
    #[error("Cannot start auto factory {name}: {error}")]
    FactoryStartFailure { name: String, error: ErrorPtr },
    #[error("Cannot publish bindings of {name}: {error}")]
    DuplicateBinding { name: String, error: RegistryError },
    #[error("Auto factory {name} publishes {found} under type {expected}")]
    IncompatibleBinding {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Runner error: {0}")]
    RunnerError(ErrorPtr),
    #[error("Cannot stop auto factory {name}: {error}")]
    FactoryStopFailure { name: String, error: ErrorPtr },
    #[error("Shutdown hook error: {0}")]
    ShutdownHookFailure(ErrorPtr),
    #[error("Application has already been run")]
    AlreadyRun,
}

/// Lifecycle state of an auto factory.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum FactoryState {
    Registered,
    Skipped,
    Started,
    Failed,
    Stopped,
}

#[derive(Clone, Eq, PartialEq, Debug, Constructor)]
pub struct FactoryStatus {
    pub name: String,
    pub priority: i32,
    pub state: FactoryState,
}

pub type ShutdownHook = Box<dyn FnOnce() -> Result<(), ErrorPtr> + Send>;

struct FactoryEntry {
    factory: AutoFactoryPtr,
    state: FactoryState,
}

/// Builder for [Application]s. Unless given explicitly, the environment and application config
/// are loaded with [Environment::init_from_environment] and
/// [ApplicationConfig::init_from_environment].
#[derive(Default)]
pub struct ApplicationBuilder {
    container: Option<InstancePtr<Container>>,
    environment: Option<InstancePtr<Environment>>,
    resolver: Option<InstancePtr<dyn ValueResolver>>,
    config: Option<ApplicationConfig>,
    factories: Vec<AutoFactoryPtr>,
    runners: Vec<ApplicationRunnerPtr>,
    shutdown_hooks: Vec<ShutdownHook>,
}

impl ApplicationBuilder {
    /// Uses given container instead of creating a new one.
    pub fn with_container(mut self, container: InstancePtr<Container>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(InstancePtr::new(environment));
        self
    }

    /// Resolves placeholders with given resolver instead of the [Environment].
    pub fn with_resolver(mut self, resolver: InstancePtr<dyn ValueResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_config(mut self, config: ApplicationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_auto_factory<F: ManagedFactory + 'static>(mut self, factory: F) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// Adds all factories registered with [register_auto_factory](crate::register_auto_factory).
    pub fn with_registered_factories(mut self) -> Self {
        self.factories.extend(registered_factories());
        self
    }

    pub fn with_runner<R: ManagedRunner + 'static>(mut self, runner: R) -> Self {
        self.runners.push(Box::new(runner));
        self
    }

    pub fn with_shutdown_hook(
        mut self,
        hook: impl FnOnce() -> Result<(), ErrorPtr> + Send + 'static,
    ) -> Self {
        self.shutdown_hooks.push(Box::new(hook));
        self
    }

    pub fn build(self) -> Result<Application, ApplicationError> {
        let config = match self.config {
            Some(config) => config,
            None => ApplicationConfig::init_from_environment().map_err(config_error)?,
        };

        let (environment, resolver) = match (self.environment, self.resolver) {
            (environment, Some(resolver)) => (environment, resolver),
            (Some(environment), None) => (
                Some(environment.clone()),
                environment as InstancePtr<dyn ValueResolver>,
            ),
            (None, None) => {
                let environment =
                    InstancePtr::new(Environment::init_from_environment().map_err(config_error)?);
                (
                    Some(environment.clone()),
                    environment as InstancePtr<dyn ValueResolver>,
                )
            }
        };

        let factories = self
            .factories
            .into_iter()
            .sorted_by_key(|factory| factory.priority())
            .map(|factory| FactoryEntry {
                factory,
                state: FactoryState::Registered,
            })
            .collect();

        Ok(Application {
            container: self.container.unwrap_or_default(),
            config: InstancePtr::new(config),
            environment,
            resolver,
            factories,
            runners: self.runners,
            shutdown_hooks: self.shutdown_hooks,
            shutdown_failures: vec![],
            has_run: false,
        })
    }
}

fn config_error<E: std::error::Error + Send + Sync + 'static>(error: E) -> ApplicationError {
    ApplicationError::Config(InstancePtr::new(error) as ErrorPtr)
}

/// Main entrypoint for the application. Bootstraps the container, starts auto factories and runs
/// [ApplicationRunners](crate::runner::ApplicationRunner).
pub struct Application {
    container: InstancePtr<Container>,
    config: InstancePtr<ApplicationConfig>,
    environment: Option<InstancePtr<Environment>>,
    resolver: InstancePtr<dyn ValueResolver>,
    factories: Vec<FactoryEntry>,
    runners: Vec<ApplicationRunnerPtr>,
    shutdown_hooks: Vec<ShutdownHook>,
    shutdown_failures: Vec<ApplicationError>,
    has_run: bool,
}

impl Application {
    #[inline]
    pub fn container(&self) -> &InstancePtr<Container> {
        &self.container
    }

    #[inline]
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Returns factories in start order.
    pub fn factory_statuses(&self) -> Vec<FactoryStatus> {
        self.factories
            .iter()
            .map(|entry| {
                FactoryStatus::new(
                    entry.factory.name().to_string(),
                    entry.factory.priority(),
                    entry.state,
                )
            })
            .collect()
    }

    /// Errors collected during the last shutdown.
    #[inline]
    pub fn shutdown_failures(&self) -> &[ApplicationError] {
        &self.shutdown_failures
    }

    /// Runs the whole application lifecycle. Returns the first startup or runner error; shutdown
    /// errors are logged and available through [Application::shutdown_failures].
    pub fn run(&mut self) -> Result<(), ApplicationError> {
        if self.has_run {
            return Err(ApplicationError::AlreadyRun);
        }

        self.has_run = true;

        if self.config.install_tracing_logger {
            install_tracing_logger(&self.config.log_level);
        }

        info!("Starting application...");

        let result = self.start();
        if let Err(error) = &result {
            error!(%error, "Application failed");
        }

        self.shutdown_failures = self.shutdown();
        result
    }

    fn start(&mut self) -> Result<(), ApplicationError> {
        self.bootstrap()?;
        self.start_factories()?;
        self.run_runners()
    }

    fn bootstrap(&self) -> Result<(), ApplicationError> {
        debug!("Registering bootstrap bindings");

        let duplicate = |error: RegistryError| ApplicationError::DuplicateBinding {
            name: BOOTSTRAP.to_string(),
            error,
        };

        let resolver = Binding::bootstrap(self.resolver.clone());
        self.container
            .register_named(ENVIRONMENT, resolver.clone())
            .map_err(duplicate)?;
        self.container
            .register_typed(TypeKey::of::<dyn ValueResolver>(), resolver)
            .map_err(duplicate)?;

        if let Some(environment) = &self.environment {
            self.container
                .register_typed(
                    TypeKey::of::<Environment>(),
                    Binding::bootstrap(environment.clone()),
                )
                .map_err(duplicate)?;
        }

        let config = Binding::bootstrap(self.config.clone());
        self.container
            .register_named(APPLICATION_CONFIG, config.clone())
            .map_err(duplicate)?;
        self.container
            .register_typed(TypeKey::of::<ApplicationConfig>(), config)
            .map_err(duplicate)
    }

    fn start_factories(&mut self) -> Result<(), ApplicationError> {
        info!("Starting auto factories...");

        for entry in &mut self.factories {
            let factory = &mut entry.factory;
            let name = factory.name().to_string();
            let resolver = current_resolver(&self.container, &self.resolver);

            self.container
                .inject_dyn(&*resolver, factory.as_injectable())
                .map_err(|error| ApplicationError::Injection {
                    name: name.clone(),
                    error,
                })?;

            if !factory.condition() {
                info!(name = %name, "Condition not met, skipping auto factory");
                entry.state = FactoryState::Skipped;
                continue;
            }

            info!(name = %name, priority = factory.priority(), "Starting auto factory");

            if let Err(error) = factory.on_start() {
                entry.state = FactoryState::Failed;
                return Err(ApplicationError::FactoryStartFailure { name, error });
            }

            entry.state = FactoryState::Started;
            publish(&self.container, &name, &**factory)?;
        }

        Ok(())
    }

    fn run_runners(&mut self) -> Result<(), ApplicationError> {
        info!("Running application runners...");

        self.runners.sort_by_key(|runner| runner.priority());

        for runner in &mut self.runners {
            let name = runner.injectable_type_name();
            let resolver = current_resolver(&self.container, &self.resolver);

            self.container
                .inject_dyn(&*resolver, runner.as_injectable())
                .map_err(|error| ApplicationError::Injection {
                    name: name.to_string(),
                    error,
                })?;

            debug!(name, "Running application runner");
            runner.run().map_err(ApplicationError::RunnerError)?;
        }

        Ok(())
    }

    fn shutdown(&mut self) -> Vec<ApplicationError> {
        info!("Shutting down application...");

        let mut failures = vec![];

        while let Some(hook) = self.shutdown_hooks.pop() {
            if let Err(error) = hook() {
                error!(%error, "Shutdown hook failed");
                failures.push(ApplicationError::ShutdownHookFailure(error));
            }
        }

        for entry in self
            .factories
            .iter_mut()
            .rev()
            .filter(|entry| entry.state == FactoryState::Started)
        {
            let name = entry.factory.name().to_string();
            info!(name = %name, "Stopping auto factory");

            if let Err(error) = entry.factory.on_stop() {
                error!(name = %name, %error, "Cannot stop auto factory");
                failures.push(ApplicationError::FactoryStopFailure { name, error });
            }

            entry.state = FactoryState::Stopped;
        }

        failures
    }
}

/// The resolver currently bound as [ENVIRONMENT], which might have been shadowed by a factory.
fn current_resolver(
    container: &Container,
    bootstrap: &InstancePtr<dyn ValueResolver>,
) -> InstancePtr<dyn ValueResolver> {
    container
        .instance_named::<dyn ValueResolver>(ENVIRONMENT)
        .unwrap_or_else(|| bootstrap.clone())
}

fn publish(
    container: &Container,
    name: &str,
    factory: &dyn ManagedFactory,
) -> Result<(), ApplicationError> {
    let duplicate = |error: RegistryError| ApplicationError::DuplicateBinding {
        name: name.to_string(),
        error,
    };

    let typed = factory
        .typed()
        .into_iter()
        .sorted_by_key(|(type_key, _)| type_key.name())
        .collect_vec();

    if let Some((type_key, binding)) = typed
        .iter()
        .find(|(type_key, binding)| binding.type_key() != *type_key)
    {
        return Err(ApplicationError::IncompatibleBinding {
            name: name.to_string(),
            expected: type_key.name(),
            found: binding.type_key().name(),
        });
    }

    for (binding_name, binding) in factory
        .named()
        .into_iter()
        .sorted_by(|(first, _), (second, _)| first.cmp(second))
    {
        debug!(factory = name, binding = %binding_name, "Publishing named binding");
        container
            .register_named(&binding_name, binding.with_origin(BindingOrigin::Factory))
            .map_err(duplicate)?;
    }

    for (type_key, binding) in typed {
        debug!(factory = name, binding = type_key.name(), "Publishing typed binding");
        container
            .register_typed(type_key, binding.with_origin(BindingOrigin::Factory))
            .map_err(duplicate)?;
    }

    Ok(())
}

fn install_tracing_logger(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        debug!("Tracing logger already installed");
    }
}

/// Creates an [Application] with the default environment, config and all statically registered
/// auto factories.
pub fn create_default() -> Result<Application, ApplicationError> {
    ApplicationBuilder::default()
        .with_registered_factories()
        .build()
}
