//! Field-level dependency injection with named and typed singletons.
//!
//! Types describe their injectable fields with annotation strings, usually through
//! `#[derive(Injectable)]`. A [Container](container::Container) populates such types, resolving
//! scalar values from placeholders and references from its [Registry](registry::Registry).

pub mod component;
pub mod container;
pub mod error;
pub mod injector;
pub mod instance_provider;
pub mod metadata;
pub mod registry;
pub mod schema;
pub mod value;

#[cfg(feature = "derive")]
pub use wicket_di_derive::Injectable;
