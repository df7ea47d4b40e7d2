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

//! # Key-Value Server Example
//!
//! A minimal RPC server exposing `get` and `set` over an in-process map.
//! Pair it with the `kv_client` example:
//!
//! ```bash
//! cargo run --example kv_server
//! cargo run --example kv_client -- set greeting '"hello"'
//! cargo run --example kv_client -- get greeting
//! ```
//!
//! Requires a Redis instance on `localhost:6379`.

use parking_lot::Mutex;
use redrpc::{HandlerRegistry, Options, RedisStore, Server, handler_fn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const REDIS_URL: &str = "redis://127.0.0.1:6379";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let store = RedisStore::connect(REDIS_URL).await?;
    let data: Arc<Mutex<HashMap<String, Value>>> = Arc::new(Mutex::new(HashMap::new()));

    let get_data = Arc::clone(&data);
    let set_data = Arc::clone(&data);
    let registry = HandlerRegistry::new()
        .with_handler(
            "get",
            handler_fn(move |req| {
                let data = Arc::clone(&get_data);
                async move {
                    let key = req.get_string("k");
                    Ok(data.lock().get(&key).cloned().unwrap_or(Value::Null))
                }
            }),
        )
        .with_handler(
            "set",
            handler_fn(move |req| {
                let data = Arc::clone(&set_data);
                async move {
                    let key = req.get_string("k");
                    let value = req.get_value("v").cloned().unwrap_or(Value::Null);
                    data.lock().insert(key, value);
                    Ok(Value::Null)
                }
            }),
        );

    let options = Options::new()
        .with_prefix("rpc_example")
        .with_server_name("kv");
    let server = Arc::new(Server::new(store, options, registry));

    let closer = Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("shutting down");
            closer.close();
        }
    });

    println!("serving get/set under prefix rpc_example (ctrl-c to stop)");
    server.run().await;
    Ok(())
}
