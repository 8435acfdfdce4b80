//! Service container
//!
//! Abstract id -> construction strategy bindings, reflective autowiring and
//! process-global singleton caching.

pub mod locator;
pub mod service_container;
pub mod stats;

pub use locator::{MapLocator, ServiceLocator};
pub use service_container::{Overrides, ServiceContainer, ServiceDescriptor, Strategy};
pub use stats::ContainerStats;

/// Type name under which the container itself can be requested by factories.
pub const CONTAINER_TYPE: &str = "ServiceContainer";

/// Interface names the container answers to.
pub const CONTAINER_INTERFACES: &[&str] = &["ContainerInterface", "ServiceLocator"];

pub(crate) fn is_container_type(name: &str) -> bool {
    name == CONTAINER_TYPE || CONTAINER_INTERFACES.contains(&name)
}

/// Bind a zero-argument factory as a singleton.
#[macro_export]
macro_rules! bind_singleton {
    ($container:expr, $id:expr, $factory:expr) => {
        $container.singleton($id, $crate::reflect::Factory::from_fn($factory))
    };
}

/// Bind a zero-argument factory as transient.
#[macro_export]
macro_rules! bind_transient {
    ($container:expr, $id:expr, $factory:expr) => {
        $container.bind($id, $crate::reflect::Factory::from_fn($factory), false)
    };
}
