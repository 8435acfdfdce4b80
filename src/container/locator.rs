//! Minimal `has`/`get` container abstraction consumed by facades

use super::ServiceContainer;
use crate::value::{Instance, Value};
use dashmap::DashMap;

pub trait ServiceLocator: Send + Sync {
    fn has(&self, id: &str) -> bool;

    fn get(&self, id: &str) -> anyhow::Result<Value>;
}

impl ServiceLocator for ServiceContainer {
    fn has(&self, id: &str) -> bool {
        ServiceContainer::has(self, id)
    }

    fn get(&self, id: &str) -> anyhow::Result<Value> {
        Ok(Value::Object(self.make(id)?))
    }
}

/// Plain id -> value map.
#[derive(Default)]
pub struct MapLocator {
    entries: DashMap<String, Value>,
}

impl MapLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, id: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(id.into(), value.into());
    }

    pub fn set_instance(&self, id: impl Into<String>, instance: Instance) {
        self.entries.insert(id.into(), Value::Object(instance));
    }

    pub fn remove(&self, id: &str) -> Option<Value> {
        self.entries.remove(id).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ServiceLocator for MapLocator {
    fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    fn get(&self, id: &str) -> anyhow::Result<Value> {
        self.entries
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| anyhow::anyhow!("Service not found: {}", id))
    }
}
