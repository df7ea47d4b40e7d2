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

#![doc = include_str!("../../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # Architecture
//!
//! RedRPC is organized into a handful of small layers:
//!
//! - **[`naming`]**: deterministic queue and key name derivation
//! - **[`envelope`]**: the JSON request/response envelopes and their codec
//! - **[`store`]**: the store adapter trait plus Redis and in-memory
//!   implementations
//! - **[`options`]**: the immutable configuration bundle and the injectable
//!   clock
//! - **[`client`]**: asynchronous submit plus deadline-bounded waiting
//! - **[`server`]**: the fair multi-queue dispatch loop with handler fault
//!   isolation
//! - **[`handler`] / [`registry`]**: the handler capability and the
//!   method-name registry
//! - **[`error`]**: the typed error taxonomy exposed to callers
//!
//! The dispatch loop is single-threaded and cooperative: each iteration
//! pops at most one message and runs exactly one handler to completion
//! before the next pop. Horizontal scaling is achieved by running several
//! independent [`Server`] instances over the same registry; the protocol is
//! concurrency-safe because every worker pops distinct messages from the
//! store.

pub mod client;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod naming;
pub mod options;
pub mod registry;
pub mod server;
pub mod store;

pub use client::Client;
pub use envelope::{Kwargs, RequestEnvelope, ResponseEnvelope};
pub use error::RpcError;
pub use handler::{Handler, HandlerError, HandlerFn, Request, handler_fn};
pub use options::{Options, TimeSource};
pub use registry::HandlerRegistry;
pub use server::Server;
pub use store::{MemoryStore, PoppedEntry, RedisStore, StoreAdapter, StoreError};
