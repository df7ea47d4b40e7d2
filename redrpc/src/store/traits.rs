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

//! The store adapter trait.

use crate::store::StoreError;
use async_trait::async_trait;
use std::time::Duration;

/// A single element popped from one of the scanned keys, together with the
/// key it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoppedEntry {
    /// The key the element was popped from.
    pub key: String,
    /// The element itself.
    pub value: String,
}

/// Minimal interface over a Redis-like store.
///
/// The runtime needs exactly this much: a blocking left pop that scans
/// several list keys, and pipelined append-plus-expire. The two keyed-value
/// operations exist for server heartbeats.
///
/// Implementations must be safe to share across tasks; both shipped
/// adapters are also cheaply cloneable so a client and a server can use
/// the same store handle.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Blocks up to `timeout` for an element on any of `keys`, scanning
    /// left to right, and returns the first available element with the
    /// key it came from.
    ///
    /// Returns `Ok(None)` when the timeout expires with no element —
    /// distinguishable from an error. With an empty `keys` slice the
    /// adapter waits out the timeout and returns `Ok(None)`, preserving
    /// the blocking bound for callers that loop.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the underlying store operation fails.
    async fn blocking_left_pop(
        &self,
        timeout: Duration,
        keys: &[String],
    ) -> Result<Option<PoppedEntry>, StoreError>;

    /// Appends `value` to the list at `key` and (re)sets the key's TTL to
    /// `ttl`, pipelined so a steady-state reader never observes the
    /// element on a key without a TTL. A crash between the two commands
    /// may leave an orphan; that window is accepted.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the underlying store operation fails.
    async fn right_push_with_expire(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Sets the plain value at `key` with a TTL of `ttl`, replacing any
    /// previous value and expiry.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the underlying store operation fails.
    async fn set_with_expire(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Returns whether `key` currently exists (and has not expired).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the underlying store operation fails.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}
