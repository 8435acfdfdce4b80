//! Dynamic values and the invoke-by-name capability
//!
//! Services reachable through facades implement [`Service`]: they report a
//! type name and hand out [`MethodFn`] handles for the methods they expose.
//! A handle is bound to a concrete type, not to an instance, so it can be
//! looked up once and cached next to the resolved instance.

use crate::container::ServiceContainer;
use downcast_rs::{impl_downcast, DowncastSync};
use std::fmt;
use std::sync::Arc;

/// A resolved service object.
pub type Instance = Arc<dyn Service>;

/// Invocable method handle: `(target, positional args) -> result`.
pub type MethodFn = Arc<dyn Fn(&dyn Service, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

pub trait Service: DowncastSync {
    /// Declared type name, used for singleton markers and diagnostics.
    fn type_name(&self) -> &str;

    /// Look up a method by name. `None` means the method does not exist.
    fn method(&self, name: &str) -> Option<MethodFn>;

    fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }
}
impl_downcast!(sync Service);

impl fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service({})", self.type_name())
    }
}

/// Build a method handle for a concrete service type.
pub fn method<T, F>(f: F) -> MethodFn
where
    T: Service,
    F: Fn(&T, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(move |target: &dyn Service, args: &[Value]| {
        let concrete = target.downcast_ref::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "method bound to {} invoked on {}",
                std::any::type_name::<T>(),
                target.type_name()
            )
        })?;
        f(concrete, args)
    })
}

#[derive(Clone)]
pub enum Value {
    /// Plain data (scalars, arrays, maps, null).
    Data(serde_json::Value),
    /// A service object.
    Object(Instance),
    /// The container itself, injected into `app`/`container` parameters.
    Container(ServiceContainer),
}

impl Value {
    pub fn null() -> Self {
        Value::Data(serde_json::Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Data(serde_json::Value::Null))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Data(data) => data.as_str(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Data(data) => data.as_bool(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Data(data) => data.as_i64(),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Downcast an object value to a concrete service type.
    pub fn object_as<T: Service>(&self) -> Option<Arc<T>> {
        self.as_object()
            .and_then(|instance| instance.clone().downcast_arc::<T>().ok())
    }

    pub fn as_container(&self) -> Option<&ServiceContainer> {
        match self {
            Value::Container(container) => Some(container),
            _ => None,
        }
    }

    /// Short description of the value's kind, for error messages.
    pub fn kind(&self) -> String {
        match self {
            Value::Data(serde_json::Value::Null) => "null".to_string(),
            Value::Data(serde_json::Value::Bool(_)) => "bool".to_string(),
            Value::Data(serde_json::Value::Number(_)) => "number".to_string(),
            Value::Data(serde_json::Value::String(_)) => "string".to_string(),
            Value::Data(serde_json::Value::Array(_)) => "array".to_string(),
            Value::Data(serde_json::Value::Object(_)) => "map".to_string(),
            Value::Object(instance) => format!("object({})", instance.type_name()),
            Value::Container(_) => "container".to_string(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(data) => write!(f, "Data({})", data),
            Value::Object(instance) => write!(f, "Object({})", instance.type_name()),
            Value::Container(_) => write!(f, "Container"),
        }
    }
}

impl PartialEq for Value {
    /// Data compares structurally, objects by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Container(a), Value::Container(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(data: serde_json::Value) -> Self {
        Value::Data(data)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Data(serde_json::Value::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Data(serde_json::Value::String(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Data(serde_json::Value::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Data(serde_json::Value::from(n))
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::null()
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

impl From<ServiceContainer> for Value {
    fn from(container: ServiceContainer) -> Self {
        Value::Container(container)
    }
}

/// Positional argument accessors for method and constructor bodies.
pub mod args {
    use super::{Instance, Value};
    use anyhow::{anyhow, Result};

    pub fn get(args: &[Value], index: usize) -> Result<&Value> {
        args.get(index)
            .ok_or_else(|| anyhow!("missing argument #{}", index))
    }

    pub fn str(args: &[Value], index: usize) -> Result<&str> {
        let value = get(args, index)?;
        value
            .as_str()
            .ok_or_else(|| anyhow!("argument #{} must be a string, got {}", index, value.kind()))
    }

    pub fn bool(args: &[Value], index: usize) -> Result<bool> {
        let value = get(args, index)?;
        value
            .as_bool()
            .ok_or_else(|| anyhow!("argument #{} must be a bool, got {}", index, value.kind()))
    }

    pub fn i64(args: &[Value], index: usize) -> Result<i64> {
        let value = get(args, index)?;
        value
            .as_i64()
            .ok_or_else(|| anyhow!("argument #{} must be an integer, got {}", index, value.kind()))
    }

    pub fn object(args: &[Value], index: usize) -> Result<Instance> {
        let value = get(args, index)?;
        value
            .as_object()
            .cloned()
            .ok_or_else(|| anyhow!("argument #{} must be an object, got {}", index, value.kind()))
    }
}
