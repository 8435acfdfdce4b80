//! Execution-context identity and the context-scoped store

pub mod resolver;
pub mod scope;
pub mod store;

pub use resolver::{
    Backend, ContextId, ContextProbe, ExecutionContextResolver, FiberProbe, ScopeProbe, TaskProbe,
};
pub use scope::{
    current_fiber, current_scope, enter_fiber, run_fiber, scope, sync_scope, FiberGuard,
};
pub use store::{ContextScopedStore, StoreValue};
