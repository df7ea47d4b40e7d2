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

//! Redis-backed store adapter.

use crate::store::{whole_seconds, PoppedEntry, StoreAdapter, StoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Store adapter over a real Redis instance.
///
/// Backed by a [`ConnectionManager`], which multiplexes one connection and
/// reconnects on failure, so clones of a `RedisStore` are cheap handles to
/// the same connection.
///
/// Note that one blocking pop occupies the connection for its full wait;
/// a client and a server sharing one `RedisStore` therefore serialize
/// their pops. Give latency-sensitive components their own instance.
///
/// # Examples
///
/// ```rust,no_run
/// use redrpc::RedisStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = RedisStore::connect("redis://127.0.0.1:6379").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Wraps an existing connection manager.
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Connects to the Redis instance at `url` (e.g.
    /// `redis://127.0.0.1:6379`).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the URL does not parse or the initial
    /// connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::with_source("invalid store URL", e))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::with_source("could not connect to store", e))?;
        Ok(Self::new(manager))
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RedisStore(..)")
    }
}

#[async_trait]
impl StoreAdapter for RedisStore {
    async fn blocking_left_pop(
        &self,
        timeout: Duration,
        keys: &[String],
    ) -> Result<Option<PoppedEntry>, StoreError> {
        if keys.is_empty() {
            tokio::time::sleep(timeout).await;
            return Ok(None);
        }

        // BLPOP 0 blocks forever; a sub-second bound still rounds to 1.
        let seconds = whole_seconds(timeout).max(1);
        let mut conn = self.manager.clone();
        let reply: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(keys)
            .arg(seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::with_source("BLPOP failed", e))?;
        Ok(reply.map(|(key, value)| PoppedEntry { key, value }))
    }

    async fn right_push_with_expire(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let seconds = whole_seconds(ttl);
        let mut conn = self.manager.clone();
        redis::pipe()
            .rpush(key, value)
            .ignore()
            .expire(key, seconds as i64)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::with_source("pipelined RPUSH/EXPIRE failed", e))?;
        Ok(())
    }

    async fn set_with_expire(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let seconds = whole_seconds(ttl).max(1);
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::with_source("SET failed", e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::with_source("EXISTS failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let result = RedisStore::connect("not-a-url").await;
        assert!(result.is_err());
    }

    // Requires a local Redis on the default port:
    //   cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_push_pop_round_trip() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let key = "redrpc-test:roundtrip".to_string();

        store
            .right_push_with_expire(&key, "payload", Duration::from_secs(5))
            .await
            .unwrap();
        let popped = store
            .blocking_left_pop(Duration::from_secs(1), std::slice::from_ref(&key))
            .await
            .unwrap()
            .expect("expected the pushed element");
        assert_eq!(popped.key, key);
        assert_eq!(popped.value, "payload");
    }

    #[tokio::test]
    #[ignore]
    async fn test_set_exists() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        store
            .set_with_expire("redrpc-test:beat", "id", Duration::from_secs(2))
            .await
            .unwrap();
        assert!(store.exists("redrpc-test:beat").await.unwrap());
        assert!(!store.exists("redrpc-test:never-set").await.unwrap());
    }
}
