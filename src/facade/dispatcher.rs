//! Facade dispatch
//!
//! Resolution order for a facade: registered mock, cached instance, then the
//! container. Two cache placements exist:
//! - global: one slot per facade shared by every logical unit, resolved
//!   through the binding registry;
//! - context-safe: one slot per facade *per execution context*, stored in
//!   the [`ContextScopedStore`] under `<cache_prefix><facade_id>` and
//!   resolved through the registry binding, or the facade's own service id
//!   when it was never bound.
//!
//! Each slot carries a method-handle cache that lives and dies with it.

use super::binding::{FacadeBindingRegistry, Mock};
use crate::config::FacadeSettings;
use crate::container::ServiceLocator;
use crate::context::ContextScopedStore;
use crate::errors::FacadeError;
use crate::value::{Instance, MethodFn, Value};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Identifies a facade: its own id plus the service id it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacadeRef<'a> {
    pub id: &'a str,
    pub service_id: &'a str,
}

impl<'a> FacadeRef<'a> {
    pub fn new(id: &'a str, service_id: &'a str) -> Self {
        Self { id, service_id }
    }
}

/// A resolved instance and the method handles looked up on it so far.
struct ResolvedFacade {
    instance: Instance,
    methods: DashMap<String, MethodFn>,
}

impl ResolvedFacade {
    fn new(instance: Instance) -> Self {
        Self {
            instance,
            methods: DashMap::new(),
        }
    }

    fn method(&self, facade: &str, name: &str) -> Result<MethodFn, FacadeError> {
        if let Some(handle) = self.methods.get(name).map(|e| e.value().clone()) {
            return Ok(handle);
        }
        let handle = self
            .instance
            .method(name)
            .ok_or_else(|| FacadeError::UndefinedMethod {
                facade: facade.to_string(),
                method: name.to_string(),
            })?;
        tracing::trace!(facade, method = name, "caching method handle");
        self.methods.insert(name.to_string(), handle.clone());
        Ok(handle)
    }
}

pub struct FacadeDispatcher {
    bindings: Arc<FacadeBindingRegistry>,
    container: RwLock<Option<Arc<dyn ServiceLocator>>>,
    resolved: DashMap<String, Arc<ResolvedFacade>>,
    store: Arc<ContextScopedStore>,
    context_safe: DashMap<String, bool>,
    settings: FacadeSettings,
}

impl FacadeDispatcher {
    pub fn new() -> Self {
        Self::with_settings(FacadeSettings::default())
    }

    pub fn with_settings(settings: FacadeSettings) -> Self {
        Self {
            bindings: Arc::new(FacadeBindingRegistry::new()),
            container: RwLock::new(None),
            resolved: DashMap::new(),
            store: Arc::new(ContextScopedStore::new()),
            context_safe: DashMap::new(),
            settings,
        }
    }

    /// Use a shared context store instead of a private one.
    pub fn with_store(mut self, store: Arc<ContextScopedStore>) -> Self {
        self.store = store;
        self
    }

    /// Share a binding registry with other dispatchers.
    pub fn with_bindings(mut self, bindings: Arc<FacadeBindingRegistry>) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn bindings(&self) -> &Arc<FacadeBindingRegistry> {
        &self.bindings
    }

    pub fn store(&self) -> &Arc<ContextScopedStore> {
        &self.store
    }

    pub fn settings(&self) -> &FacadeSettings {
        &self.settings
    }

    pub fn set_container(&self, container: Arc<dyn ServiceLocator>) {
        tracing::debug!("facade container set");
        *self.container.write() = Some(container);
    }

    pub fn container(&self) -> Option<Arc<dyn ServiceLocator>> {
        self.container.read().clone()
    }

    pub fn bind(&self, facade_id: &str, service_id: &str) {
        self.bindings.bind(facade_id, service_id);
    }

    pub fn mock(&self, facade_id: &str, mock: impl Into<Mock>) {
        self.bindings.mock(facade_id, mock);
    }

    pub fn clear_mock(&self, facade_id: &str) -> bool {
        self.bindings.clear_mock(facade_id)
    }

    pub fn set_context_safe(&self, facade_id: &str, enabled: bool) {
        self.context_safe.insert(facade_id.to_string(), enabled);
    }

    /// Per-facade flag, falling back to the configured default.
    pub fn is_context_safe(&self, facade_id: &str) -> bool {
        self.context_safe
            .get(facade_id)
            .map(|flag| *flag.value())
            .unwrap_or(self.settings.context_safe)
    }

    pub fn resolve(&self, facade: FacadeRef<'_>) -> Result<Instance, FacadeError> {
        Ok(self.entry(facade)?.instance.clone())
    }

    /// Forward `method` with positional `args` to the resolved instance.
    pub fn call(&self, facade: FacadeRef<'_>, method: &str, args: &[Value]) -> Result<Value, FacadeError> {
        let entry = self.entry(facade)?;
        let handle = entry.method(facade.id, method)?;
        handle(entry.instance.as_ref(), args).map_err(|source| FacadeError::InvocationError {
            facade: facade.id.to_string(),
            method: method.to_string(),
            source,
        })
    }

    /// Advisory: resolves if needed, reports `false` on any failure.
    pub fn has_method(&self, facade: FacadeRef<'_>, method: &str) -> bool {
        self.entry(facade)
            .map(|entry| entry.instance.has_method(method))
            .unwrap_or(false)
    }

    /// Whether a call would be answered without touching the container.
    pub fn is_resolved(&self, facade: FacadeRef<'_>) -> bool {
        if self.bindings.has_mock(facade.id) {
            return true;
        }
        if self.is_context_safe(facade.id) {
            self.store.has(&self.cache_key(facade.id))
        } else {
            self.resolved.contains_key(facade.id)
        }
    }

    /// Drop the facade's cached instance (and its method handles) from both
    /// the global slot and the current context, whichever mode is active.
    pub fn clear(&self, facade: FacadeRef<'_>) {
        tracing::debug!(facade = facade.id, "clearing facade instance");
        self.store.delete(&self.cache_key(facade.id));
        self.resolved.remove(facade.id);
    }

    /// The service id a facade resolves to: its registry binding, else the
    /// id it was declared with.
    pub fn service_id(&self, facade: FacadeRef<'_>) -> String {
        self.bindings
            .get_service_id(facade.id)
            .unwrap_or_else(|| facade.service_id.to_string())
    }

    /// Context-safe: drop the current context's whole slice.
    /// Global: drop every resolved instance, mock and binding.
    pub fn clear_all(&self, facade: FacadeRef<'_>) {
        if self.is_context_safe(facade.id) {
            self.store.clear();
        } else {
            tracing::debug!(resolved = self.resolved.len(), "clearing all facade state");
            self.resolved.clear();
            self.bindings.clear_all();
        }
    }

    /// Drop every facade instance cached in the current context, leaving
    /// other keys of the slice alone.
    pub fn clear_context_facades(&self) {
        self.store.clear_by_prefix(&self.settings.cache_prefix);
    }

    /// Facade ids holding a global slot, sorted.
    pub fn resolved_facades(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.resolved.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    fn entry(&self, facade: FacadeRef<'_>) -> Result<Arc<ResolvedFacade>, FacadeError> {
        if let Some(mock) = self.bindings.get_mock(facade.id) {
            tracing::trace!(facade = facade.id, "using mock");
            return Ok(Arc::new(ResolvedFacade::new(mock.resolve())));
        }
        if self.is_context_safe(facade.id) {
            self.context_entry(facade)
        } else {
            self.global_entry(facade)
        }
    }

    fn global_entry(&self, facade: FacadeRef<'_>) -> Result<Arc<ResolvedFacade>, FacadeError> {
        if let Some(entry) = self.resolved.get(facade.id).map(|e| e.value().clone()) {
            return Ok(entry);
        }

        let service_id = self
            .bindings
            .get_service_id(facade.id)
            .ok_or_else(|| FacadeError::UnknownFacade(facade.id.to_string()))?;
        let container = self.require_container(facade.id)?;
        if !container.has(&service_id) {
            return Err(FacadeError::NoResolvedInstance {
                facade: facade.id.to_string(),
                service_id,
            });
        }
        let value = container
            .get(&service_id)
            .map_err(|source| FacadeError::Lookup {
                facade: facade.id.to_string(),
                service_id: service_id.clone(),
                source,
            })?;
        let instance = into_instance(facade.id, value)?;

        tracing::debug!(facade = facade.id, service = %service_id, "resolved facade");
        let entry = self
            .resolved
            .entry(facade.id.to_string())
            .or_insert_with(|| Arc::new(ResolvedFacade::new(instance)))
            .value()
            .clone();
        Ok(entry)
    }

    fn context_entry(&self, facade: FacadeRef<'_>) -> Result<Arc<ResolvedFacade>, FacadeError> {
        let key = self.cache_key(facade.id);
        if let Some(entry) = self.store.get_as::<ResolvedFacade>(&key) {
            return Ok(entry);
        }

        let service_id = self.service_id(facade);
        let container = self.require_container(facade.id)?;
        let value = container
            .get(&service_id)
            .map_err(|source| FacadeError::Resolution {
                facade: facade.id.to_string(),
                service_id: service_id.clone(),
                source,
            })?;
        let instance = into_instance(facade.id, value)?;

        tracing::debug!(
            facade = facade.id,
            service = %service_id,
            context = %self.store.current_id(),
            "resolved facade in context"
        );
        let entry = Arc::new(ResolvedFacade::new(instance));
        self.store.set_arc(key, entry.clone());
        Ok(entry)
    }

    fn require_container(&self, facade_id: &str) -> Result<Arc<dyn ServiceLocator>, FacadeError> {
        self.container().ok_or_else(|| FacadeError::ContainerNotSet {
            facade: facade_id.to_string(),
        })
    }

    fn cache_key(&self, facade_id: &str) -> String {
        format!("{}{}", self.settings.cache_prefix, facade_id)
    }
}

impl Default for FacadeDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn into_instance(facade_id: &str, value: Value) -> Result<Instance, FacadeError> {
    match value {
        Value::Object(instance) => Ok(instance),
        other => Err(FacadeError::NotAnObject {
            facade: facade_id.to_string(),
            found: other.kind(),
        }),
    }
}
