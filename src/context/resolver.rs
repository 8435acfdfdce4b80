//! Execution context identity
//!
//! The current logical unit is found by walking a chain of probes in fixed
//! priority order; the first probe that reports an active unit wins and
//! the process id is the fallback that never fails.

use super::scope;
use crate::runtime;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Which kind of unit an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Scope,
    Task,
    Fiber,
    Process,
    /// Tag produced by a custom probe.
    Other,
}

impl Backend {
    pub fn tag(&self) -> &'static str {
        match self {
            Backend::Scope => "scope",
            Backend::Task => "task",
            Backend::Fiber => "fiber",
            Backend::Process => "proc",
            Backend::Other => "other",
        }
    }

    fn from_tag(tag: &str) -> Self {
        match tag {
            "scope" => Backend::Scope,
            "task" => Backend::Task,
            "fiber" => Backend::Fiber,
            "proc" => Backend::Process,
            _ => Backend::Other,
        }
    }
}

/// Opaque `<backend>:<value>` identity of a logical unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(String);

impl ContextId {
    pub fn new(backend: &str, value: impl fmt::Display) -> Self {
        ContextId(format!("{}:{}", backend, value))
    }

    pub fn process() -> Self {
        ContextId::new(Backend::Process.tag(), std::process::id())
    }

    pub fn backend(&self) -> Backend {
        let tag = self.0.split(':').next().unwrap_or_default();
        Backend::from_tag(tag)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One capability check in the resolution chain.
pub trait ContextProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Some(id)` when this backend is active and exposes a live unit.
    fn try_resolve(&self) -> Option<ContextId>;
}

/// Explicit scopes opened with [`scope::scope`] / [`scope::sync_scope`].
pub struct ScopeProbe;

impl ContextProbe for ScopeProbe {
    fn name(&self) -> &'static str {
        Backend::Scope.tag()
    }

    fn try_resolve(&self) -> Option<ContextId> {
        scope::current_scope().map(|id| ContextId::new(Backend::Scope.tag(), id))
    }
}

/// The tokio task currently being polled.
pub struct TaskProbe;

impl ContextProbe for TaskProbe {
    fn name(&self) -> &'static str {
        Backend::Task.tag()
    }

    fn try_resolve(&self) -> Option<ContextId> {
        if !runtime::has_tokio() {
            return None;
        }
        tokio::task::try_id().map(|id| ContextId::new(Backend::Task.tag(), id))
    }
}

/// Synchronous fibers entered with [`scope::enter_fiber`].
pub struct FiberProbe;

impl ContextProbe for FiberProbe {
    fn name(&self) -> &'static str {
        Backend::Fiber.tag()
    }

    fn try_resolve(&self) -> Option<ContextId> {
        scope::current_fiber().map(|id| ContextId::new(Backend::Fiber.tag(), id))
    }
}

pub struct ExecutionContextResolver {
    probes: Vec<Arc<dyn ContextProbe>>,
    fallback: ContextId,
}

impl ExecutionContextResolver {
    /// Default chain: scope, task, fiber, process.
    pub fn new() -> Self {
        Self::with_probes(vec![
            Arc::new(ScopeProbe),
            Arc::new(TaskProbe),
            Arc::new(FiberProbe),
        ])
    }

    pub fn with_probes(probes: Vec<Arc<dyn ContextProbe>>) -> Self {
        Self {
            probes,
            fallback: ContextId::process(),
        }
    }

    pub fn probe_names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|probe| probe.name()).collect()
    }

    /// Identity of the currently active logical unit. Never fails.
    pub fn current_id(&self) -> ContextId {
        for probe in &self.probes {
            match panic::catch_unwind(AssertUnwindSafe(|| probe.try_resolve())) {
                Ok(Some(id)) => return id,
                Ok(None) => {}
                Err(_) => {
                    tracing::warn!(probe = probe.name(), "context probe panicked, skipping");
                }
            }
        }
        self.fallback.clone()
    }
}

impl Default for ExecutionContextResolver {
    fn default() -> Self {
        Self::new()
    }
}
