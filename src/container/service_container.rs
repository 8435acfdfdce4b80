//! Reflective service container
//!
//! Resolution is depth-first and synchronous: every dependency is fully
//! built before its dependent, so a partially constructed object never
//! escapes. Singleton promotion is decided after construction, either from
//! the binding (`singleton: true`) or from the constructed type's
//! always-singleton marker. When promotion is known up front (a singleton
//! binding, or a class carrying the marker) construction runs under a
//! per-id lock, so concurrent first resolutions build exactly once.

use super::is_container_type;
use super::stats::{ContainerStats, InnerStats};
use crate::errors::ContainerError;
use crate::reflect::{Factory, Parameter, ParamType, Reflect, TypeDescriptor, TypeRegistry};
use crate::value::{Instance, Service, Value};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Named parameter overrides for a single `make_with` call.
pub type Overrides = HashMap<String, Value>;

/// How an abstract id is turned into an object.
#[derive(Debug, Clone)]
pub enum Strategy {
    Factory(Factory),
    /// Build the named type through its registered descriptor.
    Class(String),
}

impl From<Factory> for Strategy {
    fn from(factory: Factory) -> Self {
        Strategy::Factory(factory)
    }
}

impl From<&str> for Strategy {
    fn from(class: &str) -> Self {
        Strategy::Class(class.to_string())
    }
}

impl From<String> for Strategy {
    fn from(class: String) -> Self {
        Strategy::Class(class)
    }
}

#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub abstract_id: String,
    pub strategy: Strategy,
    pub singleton: bool,
}

/// Where a parameter list comes from; factories may ask for the container by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    Constructor,
    Factory,
}

#[derive(Clone)]
pub struct ServiceContainer {
    bindings: Arc<DashMap<String, ServiceDescriptor>>,
    instances: Arc<DashMap<String, Instance>>,
    /// One construction lock per singleton id.
    construction: Arc<DashMap<String, Arc<Mutex<()>>>>,
    types: Arc<TypeRegistry>,
    stats: Arc<InnerStats>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::with_types(Arc::new(TypeRegistry::new()))
    }

    /// Container sharing an existing type registry.
    pub fn with_types(types: Arc<TypeRegistry>) -> Self {
        Self {
            bindings: Arc::new(DashMap::new()),
            instances: Arc::new(DashMap::new()),
            construction: Arc::new(DashMap::new()),
            types,
            stats: Arc::new(InnerStats::default()),
        }
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    pub fn register_type(&self, descriptor: TypeDescriptor) {
        self.types.register(descriptor);
    }

    pub fn register<T: Reflect>(&self) {
        self.types.register_type::<T>();
    }

    /// Register or overwrite a binding. Nothing is constructed here.
    pub fn bind(&self, abstract_id: impl Into<String>, strategy: impl Into<Strategy>, singleton: bool) {
        let abstract_id = abstract_id.into();
        tracing::debug!(abstract_id = %abstract_id, singleton, "binding service");
        let descriptor = ServiceDescriptor {
            abstract_id: abstract_id.clone(),
            strategy: strategy.into(),
            singleton,
        };
        self.bindings.insert(abstract_id, descriptor);
    }

    pub fn singleton(&self, abstract_id: impl Into<String>, strategy: impl Into<Strategy>) {
        self.bind(abstract_id, strategy, true);
    }

    /// Seed the instance cache directly, bypassing any strategy.
    pub fn instance(&self, abstract_id: impl Into<String>, instance: Instance) {
        let abstract_id = abstract_id.into();
        tracing::debug!(abstract_id = %abstract_id, type_name = %instance.type_name(), "seeding instance");
        self.instances.insert(abstract_id, instance);
    }

    pub fn make(&self, abstract_id: &str) -> Result<Instance, ContainerError> {
        self.make_with(abstract_id, &Overrides::new())
    }

    /// Resolve with named parameter overrides for the top-level type.
    pub fn make_with(&self, abstract_id: &str, overrides: &Overrides) -> Result<Instance, ContainerError> {
        let mut stack = Vec::new();
        self.resolve(abstract_id, overrides, &mut stack)
    }

    /// Resolve and downcast to a concrete service type.
    pub fn make_as<T: Service>(&self, abstract_id: &str) -> Result<Arc<T>, ContainerError> {
        let instance = self.make(abstract_id)?;
        let actual = instance.type_name().to_string();
        instance
            .downcast_arc::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                abstract_id: abstract_id.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                actual,
            })
    }

    pub fn has(&self, abstract_id: &str) -> bool {
        self.instances.contains_key(abstract_id) || self.bindings.contains_key(abstract_id)
    }

    /// Whether an instance is currently cached for the id.
    pub fn is_shared(&self, abstract_id: &str) -> bool {
        self.instances.contains_key(abstract_id)
    }

    pub fn descriptor(&self, abstract_id: &str) -> Option<ServiceDescriptor> {
        self.bindings.get(abstract_id).map(|entry| entry.value().clone())
    }

    pub fn bound_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.bindings.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Drop one cached instance; the binding stays.
    pub fn forget_instance(&self, abstract_id: &str) -> Option<Instance> {
        self.instances.remove(abstract_id).map(|(_, instance)| instance)
    }

    /// Drop every binding and cached instance. Type descriptors are kept.
    pub fn flush(&self) {
        tracing::debug!(
            bindings = self.bindings.len(),
            instances = self.instances.len(),
            "flushing container"
        );
        self.bindings.clear();
        self.instances.clear();
        self.construction.clear();
    }

    pub fn get_stats(&self) -> ContainerStats {
        ContainerStats::snapshot(&self.stats, self.bindings.len(), self.instances.len())
    }

    /// Whether both handles point at the same container state.
    pub fn same_as(&self, other: &ServiceContainer) -> bool {
        Arc::ptr_eq(&self.bindings, &other.bindings)
    }

    fn resolve(&self, abstract_id: &str, overrides: &Overrides, stack: &mut Vec<String>) -> Result<Instance, ContainerError> {
        InnerStats::bump(&self.stats.total_resolutions);

        if let Some(instance) = self.instances.get(abstract_id).map(|e| e.value().clone()) {
            InnerStats::bump(&self.stats.singleton_cache_hits);
            tracing::trace!(abstract_id, "instance cache hit");
            return Ok(instance);
        }
        InnerStats::bump(&self.stats.singleton_cache_misses);

        if stack.iter().any(|id| id == abstract_id) {
            let mut chain = stack.clone();
            chain.push(abstract_id.to_string());
            return Err(ContainerError::CircularDependency { chain });
        }

        // Clone out of the map so no shard lock is held while recursing.
        let descriptor = self.descriptor(abstract_id);
        let declared_singleton = descriptor.as_ref().map(|d| d.singleton).unwrap_or(false);
        let strategy = descriptor
            .map(|d| d.strategy)
            .unwrap_or_else(|| Strategy::Class(abstract_id.to_string()));
        let known_singleton = declared_singleton
            || matches!(&strategy, Strategy::Class(class) if self.types.is_always_singleton(class));

        // Cycles are rejected above, so a thread never waits on a lock it holds.
        let slot = known_singleton.then(|| self.construction_slot(abstract_id));
        let guard = slot.as_ref().map(|slot| slot.lock());
        if guard.is_some() {
            if let Some(instance) = self.instances.get(abstract_id).map(|e| e.value().clone()) {
                InnerStats::bump(&self.stats.singleton_cache_hits);
                tracing::trace!(abstract_id, "built by a concurrent resolution");
                return Ok(instance);
            }
        }

        stack.push(abstract_id.to_string());
        let built = match &strategy {
            Strategy::Factory(factory) => self.invoke_factory(abstract_id, factory, overrides, stack),
            Strategy::Class(class) => self.build(class, overrides, stack),
        };
        stack.pop();
        let object = built?;
        InnerStats::bump(&self.stats.constructions);

        let marked = self.types.is_always_singleton(object.type_name());
        if declared_singleton || marked {
            tracing::debug!(
                abstract_id,
                type_name = %object.type_name(),
                declared_singleton,
                marked,
                "promoting to singleton"
            );
            let shared = self
                .instances
                .entry(abstract_id.to_string())
                .or_insert(object)
                .value()
                .clone();
            return Ok(shared);
        }

        Ok(object)
    }

    fn construction_slot(&self, abstract_id: &str) -> Arc<Mutex<()>> {
        self.construction
            .entry(abstract_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn build(&self, class: &str, overrides: &Overrides, stack: &mut Vec<String>) -> Result<Instance, ContainerError> {
        let descriptor = self
            .types
            .get(class)
            .ok_or_else(|| ContainerError::UnknownType(class.to_string()))?;
        let constructor = match descriptor.constructor() {
            Some(constructor) if descriptor.is_instantiable() => constructor.clone(),
            _ => return Err(ContainerError::NotInstantiable(class.to_string())),
        };

        let args = self.resolve_parameters(class, descriptor.parameters(), overrides, stack, Site::Constructor)?;
        tracing::debug!(type_name = class, arity = args.len(), "constructing");
        constructor(args).map_err(|source| ContainerError::ConstructionFailed {
            type_name: class.to_string(),
            source,
        })
    }

    fn invoke_factory(
        &self,
        abstract_id: &str,
        factory: &Factory,
        overrides: &Overrides,
        stack: &mut Vec<String>,
    ) -> Result<Instance, ContainerError> {
        let owner = format!("factory for '{}'", abstract_id);
        let args = self.resolve_parameters(&owner, factory.parameters(), overrides, stack, Site::Factory)?;
        tracing::debug!(abstract_id, arity = args.len(), "invoking factory");
        let result = factory
            .invoke(args)
            .map_err(|source| ContainerError::ConstructionFailed {
                type_name: owner.clone(),
                source,
            })?;
        match result {
            Value::Object(instance) => Ok(instance),
            other => Err(ContainerError::InvalidFactoryResult {
                abstract_id: abstract_id.to_string(),
                found: other.kind(),
            }),
        }
    }

    fn resolve_parameters(
        &self,
        owner: &str,
        parameters: &[Parameter],
        overrides: &Overrides,
        stack: &mut Vec<String>,
        site: Site,
    ) -> Result<Vec<Value>, ContainerError> {
        parameters
            .iter()
            .map(|parameter| self.resolve_parameter(owner, parameter, overrides, stack, site))
            .collect()
    }

    /// Override -> class type -> union -> default -> null -> `app`/`container` name.
    fn resolve_parameter(
        &self,
        owner: &str,
        parameter: &Parameter,
        overrides: &Overrides,
        stack: &mut Vec<String>,
        site: Site,
    ) -> Result<Value, ContainerError> {
        if let Some(value) = overrides.get(&parameter.name) {
            return Ok(value.clone());
        }

        let wanted = match &parameter.ty {
            Some(ParamType::Named(name)) => Some(name.as_str()),
            Some(ty @ ParamType::Union(_)) => ty.first_named(),
            _ => None,
        };
        if let Some(type_name) = wanted {
            if site == Site::Factory && is_container_type(type_name) {
                return Ok(Value::Container(self.clone()));
            }
            return self
                .resolve(type_name, &Overrides::new(), stack)
                .map(Value::Object);
        }

        if let Some(default) = &parameter.default {
            return Ok(default.clone());
        }
        if parameter.accepts_null() {
            return Ok(Value::null());
        }
        if parameter.name == "app" || parameter.name == "container" {
            return Ok(Value::Container(self.clone()));
        }

        Err(ContainerError::UnresolvedDependency {
            parameter: parameter.name.clone(),
            target: owner.to_string(),
        })
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("bindings", &self.bound_ids())
            .field("instances", &self.instances.len())
            .field("types", &self.types.len())
            .finish()
    }
}
