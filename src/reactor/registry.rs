//! Method-keyed handler registry for protocol events

use serde_json::Value;
use std::collections::HashMap;

/// Callback invoked with an event's `message` payload
pub type EventHandler = Box<dyn Fn(&Value) + Send + Sync>;

/// Matches every event method when registered
pub const WILDCARD: &str = "*";

/// Registry mapping lower-cased method names to handlers.
///
/// Owned by the reactor and mutated only through [`HandlerRegistry::register`];
/// the last registration for a method wins.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, EventHandler>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` (or [`WILDCARD`] for all methods)
    pub fn register<F>(&mut self, method: &str, callback: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.handlers.insert(method.to_lowercase(), Box::new(callback));
    }

    /// Dispatch one event message to the matching handler.
    ///
    /// The wildcard handler, when present, shadows any method-specific one.
    /// Unmatched methods are dropped: unregistered events are expected, not
    /// errors.
    pub fn dispatch(&self, method: &str, message: &Value) -> bool {
        if let Some(handler) = self.handlers.get(WILDCARD) {
            handler(message);
            return true;
        }
        if let Some(handler) = self.handlers.get(&method.to_lowercase()) {
            handler(message);
            return true;
        }
        false
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
