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

//! # Key-Value Client Example
//!
//! The command-line counterpart of `kv_server`:
//!
//! ```bash
//! cargo run --example kv_client -- get <key>
//! cargo run --example kv_client -- set <key> <json-value>
//! ```
//!
//! Requires a Redis instance on `localhost:6379` and a running
//! `kv_server`.

use redrpc::{Client, Kwargs, Options, RedisStore};
use serde_json::{Value, json};
use std::env;
use std::process::ExitCode;

const REDIS_URL: &str = "redis://127.0.0.1:6379";

fn usage(program: &str) -> ExitCode {
    eprintln!("Usage: {program} (get <k> | set <k> <v>)");
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("kv_client");

    let store = match RedisStore::connect(REDIS_URL).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("could not connect to {REDIS_URL}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let client = Client::new(store, Options::new().with_prefix("rpc_example"));

    match args.get(1).map(String::as_str) {
        Some("get") if args.len() == 3 => {
            let mut kwargs = Kwargs::new();
            kwargs.insert("k".into(), json!(args[2]));
            match client.call("get", kwargs).await {
                Ok(value) => {
                    println!("{value}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("get failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Some("set") if args.len() == 4 => {
            // The value argument is JSON; a bare word is taken as a string.
            let value: Value =
                serde_json::from_str(&args[3]).unwrap_or_else(|_| json!(args[3]));
            let mut kwargs = Kwargs::new();
            kwargs.insert("k".into(), json!(args[2]));
            kwargs.insert("v".into(), value);
            match client.call("set", kwargs).await {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("set failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        _ => usage(program),
    }
}
