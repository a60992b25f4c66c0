//! Runners executing actual application logic.

#[cfg(test)]
use mockall::automock;
use wicket_di::component::DynInjectable;
pub use wicket_di::instance_provider::ErrorPtr;

/// Runs application logic, e.g. a server main loop. Runners are injected and run by the
/// [Application](crate::application::Application) after all auto factories have started.
#[cfg_attr(test, automock)]
pub trait ApplicationRunner {
    /// Runs any application code.
    fn run(&self) -> Result<(), ErrorPtr>;

    /// Returns the priority for this runner. Lower priorities get run first. Default 0.
    fn priority(&self) -> i32 {
        0
    }
}

/// An [ApplicationRunner] which can be injected.
#[doc(hidden)]
pub trait ManagedRunner: ApplicationRunner + DynInjectable {
    fn as_injectable(&mut self) -> &mut dyn DynInjectable;
}

impl<T: ApplicationRunner + DynInjectable> ManagedRunner for T {
    #[inline]
    fn as_injectable(&mut self) -> &mut dyn DynInjectable {
        self
    }
}

pub type ApplicationRunnerPtr = Box<dyn ManagedRunner>;
