//! Per-context key/value store
//!
//! Every operation is keyed by the resolver's *current* id at call time, so
//! a logical unit only ever sees and mutates its own slice.

use super::resolver::{ContextId, ExecutionContextResolver};
use super::scope;
use dashmap::DashMap;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

pub type StoreValue = Arc<dyn Any + Send + Sync>;

type Slice = HashMap<String, StoreValue>;

pub struct ContextScopedStore {
    resolver: Arc<ExecutionContextResolver>,
    slices: DashMap<ContextId, Slice>,
}

impl ContextScopedStore {
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(ExecutionContextResolver::new()))
    }

    pub fn with_resolver(resolver: Arc<ExecutionContextResolver>) -> Self {
        Self {
            resolver,
            slices: DashMap::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<ExecutionContextResolver> {
        &self.resolver
    }

    pub fn current_id(&self) -> ContextId {
        self.resolver.current_id()
    }

    pub fn get(&self, key: &str) -> Option<StoreValue> {
        let id = self.current_id();
        self.slices
            .get(&id)
            .and_then(|slice| slice.get(key).cloned())
    }

    pub fn get_or(&self, key: &str, default: StoreValue) -> StoreValue {
        self.get(key).unwrap_or(default)
    }

    /// Typed read; `None` when missing or stored under another type.
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key).and_then(|value| value.downcast::<T>().ok())
    }

    pub fn has(&self, key: &str) -> bool {
        let id = self.current_id();
        self.slices
            .get(&id)
            .map(|slice| slice.contains_key(key))
            .unwrap_or(false)
    }

    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.set_arc(key, Arc::new(value));
    }

    pub fn set_arc(&self, key: impl Into<String>, value: StoreValue) {
        let id = self.current_id();
        self.slices.entry(id).or_default().insert(key.into(), value);
    }

    pub fn delete(&self, key: &str) {
        let id = self.current_id();
        if let Some(mut slice) = self.slices.get_mut(&id) {
            slice.remove(key);
        }
    }

    /// Remove every key of the current context starting with `prefix`.
    pub fn clear_by_prefix(&self, prefix: &str) {
        let id = self.current_id();
        if let Some(mut slice) = self.slices.get_mut(&id) {
            let before = slice.len();
            slice.retain(|key, _| !key.starts_with(prefix));
            tracing::debug!(
                context = %id,
                prefix,
                removed = before - slice.len(),
                "cleared context keys by prefix"
            );
        }
    }

    /// Drop the current context's whole slice.
    pub fn clear(&self) {
        let id = self.current_id();
        tracing::debug!(context = %id, "clearing context slice");
        self.slices.remove(&id);
    }

    /// Keys of the current context, sorted.
    pub fn keys(&self) -> Vec<String> {
        let id = self.current_id();
        let mut keys: Vec<String> = self
            .slices
            .get(&id)
            .map(|slice| slice.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of contexts holding at least one slice.
    pub fn context_count(&self) -> usize {
        self.slices.len()
    }

    /// Drop the slice of a unit that is known to be finished.
    pub fn evict(&self, id: &ContextId) -> bool {
        self.slices.remove(id).is_some()
    }

    /// Run `fut` in a fresh scope and evict that scope's slice afterwards.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        let scope_id = scope::next_scope_id();
        let output = scope::scope_with_id(scope_id, fut).await;
        self.evict(&ContextId::new("scope", scope_id));
        output
    }

    /// Synchronous counterpart of [`ContextScopedStore::scope`].
    pub fn sync_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let scope_id = scope::next_scope_id();
        let output = scope::sync_scope_with_id(scope_id, f);
        self.evict(&ContextId::new("scope", scope_id));
        output
    }
}

impl Default for ContextScopedStore {
    fn default() -> Self {
        Self::new()
    }
}
