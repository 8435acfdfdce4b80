//! Ready-made test double for facades

use crate::value::{method, MethodFn, Service, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Handler = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Service double with canned answers per method and call recording.
pub struct MockService {
    name: String,
    handlers: HashMap<String, Handler>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `method` with a fixed value.
    pub fn returning(self, method: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.on(method, move |_| Ok(value.clone()))
    }

    /// Answer `method` with a closure over the call arguments.
    pub fn on<F>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.handlers.insert(method.into(), Arc::new(handler));
        self
    }

    /// Recorded `(method, args)` pairs, oldest first.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == method).count()
    }
}

impl Service for MockService {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn method(&self, name: &str) -> Option<MethodFn> {
        let handler = self.handlers.get(name)?.clone();
        let name = name.to_string();
        Some(method::<MockService, _>(move |mock, args| {
            mock.calls.lock().push((name.clone(), args.to_vec()));
            handler(args)
        }))
    }
}
