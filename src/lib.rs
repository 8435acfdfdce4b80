//! Context-aware service resolution: a reflective service container,
//! execution-context identity, a per-context store, and static-style facades
//! that are safe under concurrent logical units.

pub mod config;
pub mod container;
pub mod context;
pub mod errors;
pub mod facade;
pub mod global;
pub mod logging;
pub mod reflect;
pub mod runtime;
pub mod value;

// Re-export commonly used items for convenience
pub use config::AppConfig;
pub use container::{MapLocator, ServiceContainer, ServiceLocator};
pub use context::{ContextId, ContextScopedStore, ExecutionContextResolver};
pub use errors::{ContainerError, Error, FacadeError, Result};
pub use facade::{Facade, FacadeBindingRegistry, FacadeDispatcher, Mock, MockService};
pub use reflect::{Factory, Parameter, ParamType, Reflect, TypeDescriptor};
pub use value::{Instance, Service, Value};
