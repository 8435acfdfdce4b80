use crate::value::Instance;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Test double registered for a facade.
#[derive(Clone)]
pub enum Mock {
    Instance(Instance),
    /// Called on every resolution; its result is never cached.
    Factory(Arc<dyn Fn() -> Instance + Send + Sync>),
}

impl Mock {
    pub fn instance(instance: Instance) -> Self {
        Mock::Instance(instance)
    }

    pub fn factory<F>(f: F) -> Self
    where
        F: Fn() -> Instance + Send + Sync + 'static,
    {
        Mock::Factory(Arc::new(f))
    }

    pub fn resolve(&self) -> Instance {
        match self {
            Mock::Instance(instance) => instance.clone(),
            Mock::Factory(factory) => factory(),
        }
    }
}

impl From<Instance> for Mock {
    fn from(instance: Instance) -> Self {
        Mock::Instance(instance)
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mock::Instance(instance) => write!(f, "Mock::Instance({})", instance.type_name()),
            Mock::Factory(_) => write!(f, "Mock::Factory"),
        }
    }
}

/// Facade id -> service id bindings, plus mock overrides.
#[derive(Default)]
pub struct FacadeBindingRegistry {
    bindings: DashMap<String, String>,
    mocks: DashMap<String, Mock>,
}

impl FacadeBindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a facade to a service id; rebinding overwrites.
    pub fn bind(&self, facade_id: impl Into<String>, service_id: impl Into<String>) {
        let facade_id = facade_id.into();
        let service_id = service_id.into();
        tracing::debug!(facade = %facade_id, service = %service_id, "binding facade");
        self.bindings.insert(facade_id, service_id);
    }

    pub fn is_bound(&self, facade_id: &str) -> bool {
        self.bindings.contains_key(facade_id)
    }

    pub fn get_service_id(&self, facade_id: &str) -> Option<String> {
        self.bindings.get(facade_id).map(|entry| entry.value().clone())
    }

    pub fn get_bindings(&self) -> HashMap<String, String> {
        self.bindings
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn unbind(&self, facade_id: &str) -> Option<String> {
        self.bindings.remove(facade_id).map(|(_, service_id)| service_id)
    }

    pub fn mock(&self, facade_id: impl Into<String>, mock: impl Into<Mock>) {
        let facade_id = facade_id.into();
        tracing::debug!(facade = %facade_id, "registering mock");
        self.mocks.insert(facade_id, mock.into());
    }

    pub fn get_mock(&self, facade_id: &str) -> Option<Mock> {
        self.mocks.get(facade_id).map(|entry| entry.value().clone())
    }

    pub fn has_mock(&self, facade_id: &str) -> bool {
        self.mocks.contains_key(facade_id)
    }

    pub fn clear_mock(&self, facade_id: &str) -> bool {
        self.mocks.remove(facade_id).is_some()
    }

    pub fn clear_mocks(&self) {
        self.mocks.clear();
    }

    pub fn clear_bindings(&self) {
        self.bindings.clear();
    }

    pub fn clear_all(&self) {
        self.clear_mocks();
        self.clear_bindings();
    }
}
