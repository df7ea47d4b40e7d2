//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The method-name to handler registry.

use crate::handler::Handler;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Mapping from method name to handler.
///
/// Built before server construction and frozen once the server takes it;
/// the server derives its call-queue list and queue-to-method map from
/// the registry exactly once.
///
/// # Examples
///
/// ```rust
/// use redrpc::{HandlerRegistry, handler_fn};
/// use serde_json::{Value, json};
///
/// let registry = HandlerRegistry::new()
///     .with_handler("get", handler_fn(|_req| async move { Ok(json!("value")) }))
///     .with_handler("set", handler_fn(|_req| async move { Ok(Value::Null) }));
///
/// assert_eq!(registry.method_names(), vec!["get", "set"]);
/// ```
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `method`, replacing any previous one, and
    /// returns the registry for chaining.
    #[must_use]
    pub fn with_handler(mut self, method: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.insert(method, handler);
        self
    }

    /// Registers a handler for `method`, replacing any previous one.
    pub fn insert(&mut self, method: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(method.into(), Arc::new(handler));
    }

    /// Returns the handler registered for `method`.
    pub fn get(&self, method: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(method).cloned()
    }

    /// Returns `true` if a handler is registered for `method`.
    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Returns the registered method names in sorted order.
    ///
    /// Sorted so that everything derived from the registry — the server's
    /// queue scan order in particular — is deterministic.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered methods.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no methods are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("methods", &self.method_names())
            .finish()
    }
}
