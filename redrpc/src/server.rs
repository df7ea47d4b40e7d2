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

//! The server dispatch loop.
//!
//! One iteration pops at most one message across all registered call
//! queues and runs exactly one handler to completion before the next pop.
//! The queue list is rotated on every pop: the store scans keys left to
//! right and returns the first non-empty one, so without rotation a
//! continuously busy early queue would starve every queue after it.
//!
//! Handlers are fault isolated (see the [`handler`](crate::handler)
//! module's contract): returned errors and panics both become error
//! responses, and the loop keeps serving.

use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::handler::{Handler, Request};
use crate::naming::{call_queue_name, heartbeat_key_name, response_queue_name};
use crate::options::Options;
use crate::registry::HandlerRegistry;
use crate::store::{PoppedEntry, StoreAdapter};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// RPC server: consumes call queues, invokes handlers, publishes
/// responses.
///
/// Construction derives, once, the call-queue list (method names in
/// sorted order) and the reverse queue-to-method map; the registry is
/// immutable from then on. All loop state is internally synchronized, so
/// a server can be shared as `Arc<Server<_>>` between the task driving
/// [`run`](Server::run) and whoever calls [`close`](Server::close).
///
/// Several independent servers may run over the same registry and store
/// for horizontal scaling; each pops distinct messages.
///
/// # Examples
///
/// ```rust,no_run
/// use redrpc::{HandlerRegistry, Options, RedisStore, Server, handler_fn};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = RedisStore::connect("redis://127.0.0.1:6379").await?;
/// let registry = HandlerRegistry::new()
///     .with_handler("ping", handler_fn(|_req| async move { Ok(json!("pong")) }));
///
/// let server = Arc::new(Server::new(store, Options::default(), registry));
/// let runner = Arc::clone(&server);
/// let task = tokio::spawn(async move { runner.run().await });
///
/// // ... later:
/// server.close();
/// task.await?;
/// # Ok(())
/// # }
/// ```
pub struct Server<S> {
    store: S,
    opts: Options,
    registry: HandlerRegistry,
    queues: Vec<String>,
    queue_methods: HashMap<String, String>,
    instance_id: String,
    closing: AtomicBool,
    iterations: AtomicU64,
    handled: AtomicU64,
    last_heartbeat: Mutex<Option<Instant>>,
}

impl<S: StoreAdapter> Server<S> {
    /// Creates a server over `store` with `opts` (absent-equivalent
    /// option values are mapped to their defaults) and the given handler
    /// registry.
    pub fn new(store: S, opts: Options, registry: HandlerRegistry) -> Self {
        let opts = opts.or_defaults();

        let mut queues = Vec::with_capacity(registry.len());
        let mut queue_methods = HashMap::with_capacity(registry.len());
        for method in registry.method_names() {
            let queue = call_queue_name(&opts.prefix, &method);
            queue_methods.insert(queue.clone(), method);
            queues.push(queue);
        }

        Self {
            store,
            opts,
            registry,
            queues,
            queue_methods,
            instance_id: Uuid::new_v4().to_string(),
            closing: AtomicBool::new(false),
            iterations: AtomicU64::new(0),
            handled: AtomicU64::new(0),
            last_heartbeat: Mutex::new(None),
        }
    }

    /// The effective options, after default resolution.
    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// This server's instance id, written into its heartbeat key.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// The call queues this server consumes, in unrotated order.
    pub fn call_queues(&self) -> &[String] {
        &self.queues
    }

    /// The number of messages handled so far.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Requests the run loop to stop. The loop observes the flag within
    /// one blocking-pop timeout; messages already popped are still
    /// handled to completion.
    pub fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`close`](Server::close) has been called.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Runs the dispatch loop until closed, the serve limit (if any) is
    /// reached, or a store error stops it.
    pub async fn run(&self) {
        debug!(
            queues = self.queues.len(),
            prefix = %self.opts.prefix,
            "dispatch loop starting",
        );
        while !self.is_closing() && !self.limit_reached() {
            if !self.run_once().await {
                return;
            }
        }
        debug!(handled = self.handled(), "dispatch loop stopped");
    }

    /// Performs exactly one loop iteration: at most one pop and one
    /// handler invocation.
    ///
    /// Returns `true` if the caller should continue, `false` after a
    /// fatal store error.
    pub async fn run_once(&self) -> bool {
        self.maybe_heartbeat().await;

        let iteration = self.iterations.fetch_add(1, Ordering::Relaxed);
        let queues = rotated(&self.queues, iteration);

        match self
            .store
            .blocking_left_pop(self.opts.blocking_pop_timeout, &queues)
            .await
        {
            Err(e) => {
                error!(error = %e, "blocking pop failed; stopping dispatch loop");
                false
            }
            Ok(None) => true,
            Ok(Some(entry)) => {
                self.handled.fetch_add(1, Ordering::Relaxed);
                self.dispatch(entry).await;
                true
            }
        }
    }

    fn limit_reached(&self) -> bool {
        self.opts
            .serve_limit
            .is_some_and(|limit| self.handled() >= limit)
    }

    /// Refreshes the heartbeat key when a name is configured and a period
    /// has elapsed. Runs inline in the loop, so refresh lag is bounded by
    /// one blocking-pop timeout plus handler time.
    async fn maybe_heartbeat(&self) {
        let Some(name) = self.opts.server_name.as_deref() else {
            return;
        };

        let due = {
            let mut last = self.last_heartbeat.lock();
            match *last {
                Some(at) if at.elapsed() < self.opts.heartbeat_period => false,
                _ => {
                    *last = Some(Instant::now());
                    true
                }
            }
        };
        if !due {
            return;
        }

        let key = heartbeat_key_name(&self.opts.prefix, name);
        if let Err(e) = self
            .store
            .set_with_expire(&key, &self.instance_id, self.opts.heartbeat_expire)
            .await
        {
            warn!(key = %key, error = %e, "could not refresh heartbeat");
        }
    }

    async fn dispatch(&self, entry: PoppedEntry) {
        let envelope = match RequestEnvelope::decode(&entry.value) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    queue = %entry.key,
                    payload = %entry.value,
                    error = %e,
                    "could not decode request; dropping message",
                );
                return;
            }
        };

        let Some(method) = self.queue_methods.get(&entry.key) else {
            warn!(queue = %entry.key, "message from an unregistered queue; dropping");
            return;
        };
        let Some(handler) = self.registry.get(method) else {
            warn!(method = %method, "no handler for method; dropping message");
            return;
        };

        self.invoke_handler(method, envelope, handler).await;
    }

    /// Runs the handler on its own task so that a panic unwinds the
    /// worker, not the dispatch loop, then publishes the outcome.
    async fn invoke_handler(
        &self,
        method: &str,
        envelope: RequestEnvelope,
        handler: Arc<dyn Handler>,
    ) {
        let request_id = envelope.id.clone();
        let request = Request::new(envelope);
        debug!(method = %method, request_id = %request_id, "invoking handler");

        let worker = tokio::spawn(async move { handler.invoke(request).await });

        let response = match worker.await {
            Ok(Ok(value)) => {
                ResponseEnvelope::success(self.opts.time_source.timestamp(), value)
            }
            Ok(Err(e)) => {
                warn!(method = %method, request_id = %request_id, error = %e, "handler returned an error");
                ResponseEnvelope::failure(self.opts.time_source.timestamp(), e.to_string())
            }
            Err(join_error) => {
                let message = match join_error.try_into_panic() {
                    Ok(payload) => panic_message(payload.as_ref()),
                    Err(join_error) => join_error.to_string(),
                };
                error!(method = %method, request_id = %request_id, message = %message, "handler aborted");
                ResponseEnvelope::failure(self.opts.time_source.timestamp(), message)
            }
        };

        self.publish(method, &request_id, &response).await;
    }

    /// Publishes a response with the result TTL. Failures here are logged
    /// only; the caller will observe a timeout.
    async fn publish(&self, method: &str, request_id: &str, response: &ResponseEnvelope) {
        let encoded = match response.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                error!(method = %method, request_id = %request_id, error = %e, "could not encode response");
                return;
            }
        };

        let queue = response_queue_name(&self.opts.prefix, method, request_id);
        if let Err(e) = self
            .store
            .right_push_with_expire(&queue, &encoded, self.opts.result_expire)
            .await
        {
            error!(queue = %queue, error = %e, "could not publish response");
        }
    }
}

impl<S> std::fmt::Debug for Server<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("prefix", &self.opts.prefix)
            .field("queues", &self.queues)
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

/// Cyclic left rotation of the queue list by `iteration mod len`.
fn rotated(queues: &[String], iteration: u64) -> Vec<String> {
    if queues.is_empty() {
        return Vec::new();
    }
    let pivot = (iteration % queues.len() as u64) as usize;
    let mut result = Vec::with_capacity(queues.len());
    result.extend_from_slice(&queues[pivot..]);
    result.extend_from_slice(&queues[..pivot]);
    result
}

/// Renders a panic payload for the error envelope: a boxed error's
/// message, a string payload verbatim, or `other error` when the payload
/// carries no usable text.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(e) = payload.downcast_ref::<Box<dyn std::error::Error + Send + Sync>>() {
        e.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else {
        "other error".to_string()
    }
}
