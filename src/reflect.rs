//! Type introspection capability
//!
//! Describes what the container needs to know about a type in order to
//! build it: its constructor parameters (name, declared type, default,
//! nullability), the constructor itself, whether it can be instantiated at
//! all, and whether the type is marked as always-singleton.

use crate::value::{Instance, Service, Value};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Builds an instance from positionally resolved constructor arguments.
pub type Constructor = Arc<dyn Fn(Vec<Value>) -> anyhow::Result<Instance> + Send + Sync>;

/// Body of a factory strategy, called with positionally resolved arguments.
pub type FactoryFn = Arc<dyn Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync>;

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Primitive type (`string`, `int`, `bool`, ...); never autowired.
    Builtin(String),
    /// A class or interface name; autowired through the container.
    Named(String),
    /// Union of alternatives; the first non-builtin alternative is autowired.
    Union(Vec<ParamType>),
}

impl ParamType {
    pub fn builtin(name: impl Into<String>) -> Self {
        ParamType::Builtin(name.into())
    }

    pub fn named(name: impl Into<String>) -> Self {
        ParamType::Named(name.into())
    }

    /// Declared type of a reflected Rust type.
    pub fn of<T: Reflect>() -> Self {
        ParamType::Named(T::TYPE_NAME.to_string())
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, ParamType::Builtin(_))
    }

    /// First alternative that can be autowired, if any.
    pub fn first_named(&self) -> Option<&str> {
        match self {
            ParamType::Named(name) => Some(name),
            ParamType::Builtin(_) => None,
            ParamType::Union(alternatives) => alternatives.iter().find_map(ParamType::first_named),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Builtin(name) | ParamType::Named(name) => write!(f, "{}", name),
            ParamType::Union(alternatives) => {
                let names: Vec<String> = alternatives.iter().map(|a| a.to_string()).collect();
                write!(f, "{}", names.join("|"))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: Option<ParamType>,
    pub default: Option<Value>,
    pub nullable: bool,
}

impl Parameter {
    /// Untyped parameter; accepts null like any untyped parameter does.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default: None,
            nullable: false,
        }
    }

    /// Parameter typed as a class or interface.
    pub fn named(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name).typed(ParamType::named(type_name))
    }

    /// Parameter typed as a primitive.
    pub fn builtin(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name).typed(ParamType::builtin(type_name))
    }

    pub fn typed(mut self, ty: ParamType) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn accepts_null(&self) -> bool {
        self.nullable || self.ty.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Concrete,
    /// Interface or abstract class; only usable through a binding.
    Abstract,
}

#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    kind: TypeKind,
    parameters: Vec<Parameter>,
    constructor: Option<Constructor>,
    always_singleton: bool,
    interfaces: Vec<String>,
}

impl TypeDescriptor {
    pub fn concrete<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Vec<Value>) -> anyhow::Result<Instance> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: TypeKind::Concrete,
            parameters: Vec::new(),
            constructor: Some(Arc::new(constructor)),
            always_singleton: false,
            interfaces: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Abstract,
            parameters: Vec::new(),
            constructor: None,
            always_singleton: false,
            interfaces: Vec::new(),
        }
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Mark the type as always-singleton, regardless of how it is bound.
    pub fn singleton(mut self) -> Self {
        self.always_singleton = true;
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn is_instantiable(&self) -> bool {
        self.kind == TypeKind::Concrete && self.constructor.is_some()
    }

    pub fn is_always_singleton(&self) -> bool {
        self.always_singleton
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("always_singleton", &self.always_singleton)
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

/// A Rust type that can describe its own constructor.
pub trait Reflect: Service + Sized {
    const TYPE_NAME: &'static str;

    fn describe() -> TypeDescriptor;
}

/// Factory strategy: a callable with declared parameters.
#[derive(Clone)]
pub struct Factory {
    parameters: Vec<Parameter>,
    body: FactoryFn,
}

impl Factory {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            body: Arc::new(body),
        }
    }

    /// Zero-parameter factory producing a service.
    pub fn from_fn<T, F>(f: F) -> Self
    where
        T: Service,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(move |_| {
            let instance: Instance = Arc::new(f());
            Ok(Value::Object(instance))
        })
    }

    /// Factory receiving the container, declared as a `ServiceContainer` parameter.
    pub fn with_container<T, F>(f: F) -> Self
    where
        T: Service,
        F: Fn(&crate::container::ServiceContainer) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::new(move |args| {
            let container = args
                .first()
                .and_then(Value::as_container)
                .ok_or_else(|| anyhow::anyhow!("container was not injected"))?;
            let instance: Instance = Arc::new(f(container)?);
            Ok(Value::Object(instance))
        })
        .param(Parameter::named("container", crate::container::CONTAINER_TYPE))
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn invoke(&self, args: Vec<Value>) -> anyhow::Result<Value> {
        (self.body)(args)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Registry of known type descriptors, keyed by type name.
#[derive(Default)]
pub struct TypeRegistry {
    types: DashMap<String, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a descriptor.
    pub fn register(&self, descriptor: TypeDescriptor) {
        tracing::debug!(type_name = %descriptor.name(), "registering type descriptor");
        self.types
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
    }

    pub fn register_type<T: Reflect>(&self) {
        self.register(T::describe());
    }

    pub fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn is_always_singleton(&self, name: &str) -> bool {
        self.types
            .get(name)
            .map(|entry| entry.is_always_singleton())
            .unwrap_or(false)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::MethodFn;

    struct Logger;

    impl Service for Logger {
        fn type_name(&self) -> &str {
            Self::TYPE_NAME
        }

        fn method(&self, _name: &str) -> Option<MethodFn> {
            None
        }
    }

    impl Reflect for Logger {
        const TYPE_NAME: &'static str = "Logger";

        fn describe() -> TypeDescriptor {
            TypeDescriptor::concrete(Self::TYPE_NAME, |_| Ok(Arc::new(Logger) as Instance))
                .singleton()
        }
    }

    #[test]
    fn union_picks_first_named_alternative() {
        let ty = ParamType::Union(vec![
            ParamType::builtin("string"),
            ParamType::named("Logger"),
            ParamType::named("Cache"),
        ]);
        assert_eq!(ty.first_named(), Some("Logger"));
        assert_eq!(ty.to_string(), "string|Logger|Cache");
        assert_eq!(ParamType::builtin("int").first_named(), None);
    }

    #[test]
    fn untyped_parameters_accept_null() {
        assert!(Parameter::new("anything").accepts_null());
        assert!(!Parameter::builtin("count", "int").accepts_null());
        assert!(Parameter::builtin("count", "int").nullable().accepts_null());
    }

    #[test]
    fn registry_reports_markers_and_instantiability() {
        let registry = TypeRegistry::new();
        registry.register_type::<Logger>();
        registry.register(TypeDescriptor::interface("LoggerInterface"));

        assert!(registry.is_always_singleton("Logger"));
        assert!(!registry.is_always_singleton("LoggerInterface"));
        assert!(!registry.is_always_singleton("Missing"));
        assert!(registry.get("Logger").unwrap().is_instantiable());
        assert!(!registry.get("LoggerInterface").unwrap().is_instantiable());
        assert_eq!(registry.names(), vec!["Logger", "LoggerInterface"]);
        assert_eq!(ParamType::of::<Logger>(), ParamType::named("Logger"));
    }
}
