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

//! The RPC client: asynchronous submit and deadline-bounded waiting.

use crate::envelope::{Kwargs, RequestEnvelope, ResponseEnvelope};
use crate::error::RpcError;
use crate::naming::{call_queue_name, heartbeat_key_name, response_queue_name};
use crate::options::Options;
use crate::store::StoreAdapter;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, warn};
use uuid::Uuid;

/// RPC client over a store adapter.
///
/// A client is cheap to construct and safe to share behind a reference;
/// it holds no per-call state. Calls are at-most-once from the caller's
/// perspective: a timeout does not retract the request, and any late
/// response is left on its queue to expire.
///
/// # Examples
///
/// ```rust,no_run
/// use redrpc::{Client, Kwargs, Options, RedisStore};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = RedisStore::connect("redis://127.0.0.1:6379").await?;
/// let client = Client::new(store, Options::default());
///
/// let mut kwargs = Kwargs::new();
/// kwargs.insert("k".into(), json!("k1"));
/// match client.call("get", kwargs).await {
///     Ok(value) => println!("got {value}"),
///     Err(e) if e.is_timeout() => println!("no server answered"),
///     Err(e) if e.is_remote_exception() => println!("handler failed: {e}"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(())
/// # }
/// ```
pub struct Client<S> {
    store: S,
    opts: Options,
}

impl<S: StoreAdapter> Client<S> {
    /// Creates a client over `store` with `opts` (absent-equivalent option
    /// values are mapped to their defaults).
    pub fn new(store: S, opts: Options) -> Self {
        Self {
            store,
            opts: opts.or_defaults(),
        }
    }

    /// The effective options, after default resolution.
    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Submits a call without waiting for the response.
    ///
    /// Generates a fresh request id, encodes the envelope, and enqueues it
    /// on the method's call queue with the request TTL. Returns the
    /// request id to later pass to [`response`](Client::response).
    ///
    /// # Errors
    ///
    /// Surfaces encoding failures as [`RpcError::Codec`] and store
    /// failures as [`RpcError::Store`].
    pub async fn submit(&self, method: &str, kwargs: Kwargs) -> Result<String, RpcError> {
        let request_id = Uuid::new_v4().to_string();
        let envelope = RequestEnvelope::new(
            request_id.clone(),
            self.opts.time_source.timestamp(),
            kwargs,
        );
        let encoded = envelope.encode()?;

        let queue = call_queue_name(&self.opts.prefix, method);
        self.store
            .right_push_with_expire(&queue, &encoded, self.opts.request_expire)
            .await?;
        Ok(request_id)
    }

    /// Waits for the response to a previously submitted call, up to the
    /// configured response timeout.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Timeout`] when the deadline elapses with no response
    /// - [`RpcError::Remote`] when the server published an error envelope;
    ///   the message is carried verbatim
    /// - [`RpcError::Store`] when a pop fails
    ///
    /// Malformed messages on the response queue are logged and skipped; a
    /// correct server publishes exactly one well-formed response per id.
    pub async fn response(&self, method: &str, request_id: &str) -> Result<Value, RpcError> {
        self.response_within(method, request_id, self.opts.response_timeout)
            .await
    }

    /// Like [`response`](Client::response) with a per-call deadline
    /// overriding the configured one.
    ///
    /// # Errors
    ///
    /// As for [`response`](Client::response).
    pub async fn response_within(
        &self,
        method: &str,
        request_id: &str,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let deadline = Instant::now() + timeout;
        let queue = response_queue_name(&self.opts.prefix, method, request_id);

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(RpcError::Timeout { waited: timeout });
            }

            // Bound each pop so a close or deadline is observed promptly,
            // but never spin with sub-second waits.
            let mut wait = self.opts.blocking_pop_timeout.min(deadline - now);
            if wait < Duration::from_secs(1) {
                wait = Duration::from_secs(1);
            }

            let popped = match self
                .store
                .blocking_left_pop(wait, std::slice::from_ref(&queue))
                .await
            {
                Ok(popped) => popped,
                Err(e) => {
                    error!(queue = %queue, error = %e, "blocking pop failed while awaiting response");
                    return Err(e.into());
                }
            };

            let Some(entry) = popped else {
                continue;
            };

            match ResponseEnvelope::decode(&entry.value) {
                Err(e) => {
                    warn!(
                        queue = %queue,
                        payload = %entry.value,
                        error = %e,
                        "malformed response; still waiting",
                    );
                    continue;
                }
                Ok(ResponseEnvelope::Failure { err, .. }) => {
                    return Err(RpcError::Remote { message: err });
                }
                Ok(ResponseEnvelope::Success { res, .. }) => return Ok(res),
            }
        }
    }

    /// Submits a call and waits for its response.
    ///
    /// # Errors
    ///
    /// As for [`submit`](Client::submit) and [`response`](Client::response).
    pub async fn call(&self, method: &str, kwargs: Kwargs) -> Result<Value, RpcError> {
        let request_id = self.submit(method, kwargs).await?;
        self.response(method, &request_id).await
    }

    /// Like [`call`](Client::call) with a per-call response deadline.
    ///
    /// # Errors
    ///
    /// As for [`call`](Client::call).
    pub async fn call_within(
        &self,
        method: &str,
        kwargs: Kwargs,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let request_id = self.submit(method, kwargs).await?;
        self.response_within(method, &request_id, timeout).await
    }

    /// Returns whether a server heartbeating under `name` is currently
    /// alive, by probing the heartbeat key's existence.
    ///
    /// # Errors
    ///
    /// Surfaces store failures as [`RpcError::Store`].
    pub async fn is_server_online(&self, name: &str) -> Result<bool, RpcError> {
        let key = heartbeat_key_name(&self.opts.prefix, name);
        Ok(self.store.exists(&key).await?)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("store", &self.store)
            .field("prefix", &self.opts.prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn fast_options() -> Options {
        Options::new().with_response_timeout(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_submit_enqueues_with_ttl() {
        let store = MemoryStore::new();
        let client = Client::new(store.clone(), fast_options());

        let request_id = client.submit("get", Kwargs::new()).await.unwrap();
        assert_eq!(request_id.len(), 36, "expected a hyphenated uuid");

        let queue = "redis_rpc:get:calls";
        assert_eq!(store.list_len(queue), 1);
        let ttl = store.ttl(queue).expect("call queue should carry a TTL");
        assert!(ttl > Duration::ZERO && ttl <= Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_submitted_envelope_decodes() {
        let store = MemoryStore::new();
        let client = Client::new(store.clone(), fast_options());

        let mut kwargs = Kwargs::new();
        kwargs.insert("k".into(), json!("k1"));
        let request_id = client.submit("get", kwargs).await.unwrap();

        let queue = vec!["redis_rpc:get:calls".to_string()];
        let entry = store
            .blocking_left_pop(Duration::from_secs(1), &queue)
            .await
            .unwrap()
            .unwrap();
        let envelope = RequestEnvelope::decode(&entry.value).unwrap();
        assert_eq!(envelope.id, request_id);
        assert_eq!(envelope.kw["k"], json!("k1"));
    }

    #[tokio::test]
    async fn test_response_times_out_without_server() {
        let store = MemoryStore::new();
        let client = Client::new(store, fast_options());

        let error = client.response("get", "no-such-id").await.unwrap_err();
        assert!(error.is_timeout());
    }

    #[tokio::test]
    async fn test_response_skips_malformed_messages() {
        let store = MemoryStore::new();
        let client = Client::new(store.clone(), fast_options());

        let queue = response_queue_name("redis_rpc", "get", "id-1");
        store
            .right_push_with_expire(&queue, "not json {", Duration::from_secs(10))
            .await
            .unwrap();
        store
            .right_push_with_expire(
                &queue,
                r#"{"ts":"t","res":"ok"}"#,
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        let value = client.response("get", "id-1").await.unwrap();
        assert_eq!(value, json!("ok"));
    }

    #[tokio::test]
    async fn test_response_surfaces_remote_error_verbatim() {
        let store = MemoryStore::new();
        let client = Client::new(store.clone(), fast_options());

        let queue = response_queue_name("redis_rpc", "get", "id-2");
        store
            .right_push_with_expire(
                &queue,
                r#"{"ts":"t","err":"fake error"}"#,
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        let error = client.response("get", "id-2").await.unwrap_err();
        assert!(error.is_remote_exception());
        assert_eq!(error.remote_message(), Some("fake error"));
    }

    #[tokio::test]
    async fn test_response_null_result() {
        let store = MemoryStore::new();
        let client = Client::new(store.clone(), fast_options());

        let queue = response_queue_name("redis_rpc", "set", "id-3");
        store
            .right_push_with_expire(&queue, r#"{"ts":"t","res":null}"#, Duration::from_secs(10))
            .await
            .unwrap();

        let value = client.response("set", "id-3").await.unwrap();
        assert_eq!(value, Value::Null);
    }
}
