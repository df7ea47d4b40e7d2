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

//! Dispatch-loop properties: fair rotation, shutdown latency, serve
//! limits, per-call deadlines, and heartbeats.

use async_trait::async_trait;
use redrpc::naming::{call_queue_name, heartbeat_key_name};
use redrpc::{
    Client, HandlerRegistry, Kwargs, MemoryStore, Options, PoppedEntry, Request, Server,
    StoreAdapter, StoreError, handler_fn,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Store double that records every pop's key scan order and always comes
/// up empty.
#[derive(Clone, Default)]
struct RecordingStore {
    scans: Arc<parking_lot::Mutex<Vec<Vec<String>>>>,
}

impl RecordingStore {
    fn scans(&self) -> Vec<Vec<String>> {
        self.scans.lock().clone()
    }
}

#[async_trait]
impl StoreAdapter for RecordingStore {
    async fn blocking_left_pop(
        &self,
        _timeout: Duration,
        keys: &[String],
    ) -> Result<Option<PoppedEntry>, StoreError> {
        self.scans.lock().push(keys.to_vec());
        Ok(None)
    }

    async fn right_push_with_expire(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn set_with_expire(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
}

/// Store double whose pops always fail.
#[derive(Clone, Default)]
struct FailingStore;

#[async_trait]
impl StoreAdapter for FailingStore {
    async fn blocking_left_pop(
        &self,
        _timeout: Duration,
        _keys: &[String],
    ) -> Result<Option<PoppedEntry>, StoreError> {
        Err(StoreError::new("connection lost"))
    }

    async fn right_push_with_expire(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        Err(StoreError::new("connection lost"))
    }

    async fn set_with_expire(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        Err(StoreError::new("connection lost"))
    }

    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::new("connection lost"))
    }
}

fn noop_registry(methods: &[&str]) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for method in methods {
        registry.insert(*method, handler_fn(|_req: Request| async move { Ok(Value::Null) }));
    }
    registry
}

#[tokio::test]
async fn test_rotation_order() {
    let store = RecordingStore::default();
    let server = Server::new(store.clone(), Options::default(), noop_registry(&["a", "b", "c"]));

    for _ in 0..4 {
        assert!(server.run_once().await);
    }

    let q = |m: &str| call_queue_name("redis_rpc", m);
    assert_eq!(
        store.scans(),
        vec![
            vec![q("a"), q("b"), q("c")],
            vec![q("b"), q("c"), q("a")],
            vec![q("c"), q("a"), q("b")],
            vec![q("a"), q("b"), q("c")],
        ],
    );
}

#[tokio::test]
async fn test_every_busy_queue_is_served_within_a_full_rotation() {
    let store = MemoryStore::new();
    let counters: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    let mut registry = HandlerRegistry::new();
    for (method, counter) in ["a", "b", "c"].iter().zip(&counters) {
        let counter = Arc::clone(counter);
        registry.insert(
            *method,
            handler_fn(move |_req: Request| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(Value::Null)
                }
            }),
        );
    }

    let client = Client::new(store.clone(), Options::default());
    for method in ["a", "b", "c"] {
        client.submit(method, Kwargs::new()).await.unwrap();
    }

    let server = Server::new(store, Options::default(), registry);
    for _ in 0..3 {
        assert!(server.run_once().await);
    }

    for (i, counter) in counters.iter().enumerate() {
        assert_eq!(counter.load(Ordering::Relaxed), 1, "method {i} was starved");
    }
}

#[tokio::test]
async fn test_store_error_stops_the_loop() {
    let server = Server::new(FailingStore, Options::default(), noop_registry(&["m"]));
    assert!(!server.run_once().await);
}

#[tokio::test]
async fn test_shutdown_latency_is_bounded() {
    let store = MemoryStore::new();
    let server = Arc::new(Server::new(store, Options::default(), noop_registry(&["m"])));
    let runner = Arc::clone(&server);
    let task = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.close();

    // The loop observes the flag within one blocking-pop timeout (1s).
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("run did not stop after close")
        .unwrap();
}

#[tokio::test]
async fn test_close_before_run_returns_immediately() {
    let store = MemoryStore::new();
    let server = Server::new(store, Options::default(), noop_registry(&["m"]));
    server.close();
    tokio::time::timeout(Duration::from_millis(100), server.run())
        .await
        .expect("run should return without popping");
    assert_eq!(server.handled(), 0);
}

#[tokio::test]
async fn test_serve_limit() {
    let store = MemoryStore::new();
    let client = Client::new(store.clone(), Options::default());
    for _ in 0..5 {
        client.submit("inc", Kwargs::new()).await.unwrap();
    }

    let server = Server::new(
        store.clone(),
        Options::new().with_serve_limit(3),
        noop_registry(&["inc"]),
    );
    tokio::time::timeout(Duration::from_secs(5), server.run())
        .await
        .expect("run should stop at the serve limit");

    assert_eq!(server.handled(), 3);
    assert_eq!(store.list_len(&call_queue_name("redis_rpc", "inc")), 2);
}

#[tokio::test]
async fn test_per_call_response_timeout_override() {
    let store = MemoryStore::new();
    let registry = HandlerRegistry::new().with_handler(
        "sleep",
        handler_fn(|_req: Request| async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(json!("done"))
        }),
    );
    let server = Arc::new(Server::new(store.clone(), Options::default(), registry));
    let runner = Arc::clone(&server);
    let task = tokio::spawn(async move { runner.run().await });

    let client = Client::new(store, Options::default());

    // The default one-second deadline is too short for this handler.
    let error = client.call("sleep", Kwargs::new()).await.unwrap_err();
    assert!(error.is_timeout());

    // A per-call deadline rides over the configured one.
    let value = client
        .call_within("sleep", Kwargs::new(), Duration::from_secs(8))
        .await
        .unwrap();
    assert_eq!(value, json!("done"));

    server.close();
    task.await.unwrap();
}

#[tokio::test]
async fn test_heartbeat_presence() {
    let store = MemoryStore::new();
    let options = Options::new()
        .with_server_name("kv")
        .with_heartbeat_expire(Duration::from_secs(10))
        .with_blocking_pop_timeout(Duration::from_millis(50));
    let server = Server::new(store.clone(), options, noop_registry(&["m"]));

    assert!(server.run_once().await);

    let key = heartbeat_key_name("redis_rpc", "kv");
    assert_eq!(store.value_of(&key).as_deref(), Some(server.instance_id()));
    let ttl = store.ttl(&key).expect("heartbeat key should carry a TTL");
    assert!(ttl > Duration::ZERO && ttl <= Duration::from_secs(10));

    let client = Client::new(store, Options::default());
    assert!(client.is_server_online("kv").await.unwrap());
    assert!(!client.is_server_online("other").await.unwrap());
}

#[tokio::test]
async fn test_unnamed_server_does_not_heartbeat() {
    let store = MemoryStore::new();
    let server = Server::new(
        store.clone(),
        Options::new().with_blocking_pop_timeout(Duration::from_millis(50)),
        noop_registry(&["m"]),
    );
    assert!(server.run_once().await);

    let client = Client::new(store, Options::default());
    assert!(!client.is_server_online("kv").await.unwrap());
}
