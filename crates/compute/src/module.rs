use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ComputeError;
use crate::modules;

/// Cooperative cancellation flag handed to a running module.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested. Modules call this
    /// between chunks of work.
    pub fn check(&self) -> Result<(), ComputeError> {
        if self.is_cancelled() {
            Err(ComputeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A stateless numeric engine reachable only through JSON data.
pub trait ComputeModule: Send + Sync {
    /// Action name this module answers to.
    fn action(&self) -> &'static str;

    fn compute(&self, data: &Value, cancel: &CancelToken) -> Result<Value, ComputeError>;
}

/// Decode a request payload, mapping shape errors to validation failures.
pub fn decode_payload<T: DeserializeOwned>(data: &Value) -> Result<T, ComputeError> {
    T::deserialize(data).map_err(|e| ComputeError::Validation(e.to_string()))
}

/// Modules by action name.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn ComputeModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled frequencies, descriptives and crosstabs modules.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(modules::Frequencies);
        registry.register(modules::Descriptives);
        registry.register(modules::Crosstabs);
        registry
    }

    /// Register a module, replacing any previous module for the same action.
    pub fn register<M: ComputeModule + 'static>(&mut self, module: M) {
        self.modules.insert(module.action().to_string(), Arc::new(module));
    }

    pub fn get(&self, action: &str) -> Option<Arc<dyn ComputeModule>> {
        self.modules.get(action).cloned()
    }

    pub fn actions(&self) -> Vec<&str> {
        let mut actions: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        actions.sort_unstable();
        actions
    }
}
