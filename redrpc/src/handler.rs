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

//! The handler capability and the request view handlers receive.
//!
//! Handlers are polymorphic over a single capability: take a [`Request`],
//! return a value or an error. [`handler_fn`] adapts plain async closures
//! so bare functions register without boilerplate.
//!
//! # Handler contract
//!
//! The server isolates every invocation on its own task. A handler that
//! returns `Err` produces an error response carrying the error's display
//! message; a handler that *panics* produces an error response carrying
//! the panic payload when it is a string or a boxed error, and the fixed
//! message `other error` otherwise. Either way the server keeps serving.
//! The runtime enforces no per-handler timeout; handlers are expected to
//! bound their own work.

use crate::envelope::RequestEnvelope;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// Error type handlers return: any boxed error. The display message is
/// what travels back to the caller.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The decoded request a handler receives.
///
/// Argument values are schemaless JSON; the accessors below pair a typed
/// view ([`get_value`](Request::get_value), explicit about absence) with a
/// widely accepting textual view ([`get_string`](Request::get_string)).
///
/// # Examples
///
/// ```rust
/// use redrpc::{Kwargs, Request, RequestEnvelope};
/// use serde_json::json;
///
/// let mut kw = Kwargs::new();
/// kw.insert("k".into(), json!("k1"));
/// kw.insert("n".into(), json!(2.0));
/// let request = Request::new(RequestEnvelope::new("id", "ts", kw));
///
/// assert_eq!(request.get_value("k"), Some(&json!("k1")));
/// assert_eq!(request.get_value("missing"), None);
/// assert_eq!(request.get_string("k"), "k1");
/// assert_eq!(request.get_string("n"), "2.0");
/// assert_eq!(request.get_string("missing"), "");
/// ```
#[derive(Clone, Debug)]
pub struct Request {
    envelope: RequestEnvelope,
}

impl Request {
    /// Wraps a decoded request envelope.
    pub fn new(envelope: RequestEnvelope) -> Self {
        Self { envelope }
    }

    /// The request id.
    pub fn id(&self) -> &str {
        &self.envelope.id
    }

    /// The client-side submission timestamp, as carried on the wire.
    /// Opaque metadata; the format is never validated.
    pub fn timestamp(&self) -> &str {
        &self.envelope.ts
    }

    /// Returns the argument value, or `None` when the name is absent.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.envelope.kw.get(name)
    }

    /// Returns the argument as a string, as widely accepting as possible:
    /// strings verbatim, absent or `null` as the empty string, and every
    /// other value in its canonical JSON rendering (note that numbers
    /// arrive floatified, so `123` renders as `123.0`). Handlers that
    /// require strict typing should use [`get_value`](Request::get_value)
    /// and validate themselves.
    pub fn get_string(&self, name: &str) -> String {
        match self.envelope.kw.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// A registered RPC handler.
///
/// Implement this directly for stateful handlers, or wrap an async
/// closure with [`handler_fn`].
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles one request.
    ///
    /// # Errors
    ///
    /// An `Err` becomes an error response for the caller; it does not
    /// affect the server loop.
    async fn invoke(&self, request: Request) -> Result<Value, HandlerError>;
}

/// Adapter that lets a plain async function or closure act as a
/// [`Handler`]. Construct with [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

/// Wraps an async function or closure as a [`Handler`].
///
/// # Examples
///
/// ```rust
/// use redrpc::{HandlerRegistry, handler_fn};
/// use serde_json::json;
///
/// let registry = HandlerRegistry::new().with_handler(
///     "ping",
///     handler_fn(|_req| async move { Ok(json!("pong")) }),
/// );
/// assert!(registry.contains("ping"));
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    async fn invoke(&self, request: Request) -> Result<Value, HandlerError> {
        (self.f)(request).await
    }
}
