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

//! In-memory store adapter for testing.

use crate::store::{PoppedEntry, StoreAdapter, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// In-process store adapter with the same observable behavior as the
/// Redis-backed one: per-key TTLs, left-to-right pop scanning, and
/// blocking pops with bounded waits.
///
/// Clones share state, so a client and a server under test can be handed
/// clones of one `MemoryStore`. Unlike the Redis adapter, TTLs here keep
/// sub-second precision.
///
/// # Examples
///
/// ```rust
/// use redrpc::{MemoryStore, StoreAdapter};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.right_push_with_expire("q", "hello", Duration::from_secs(5)).await?;
///
/// let keys = vec!["q".to_string()];
/// let popped = store.blocking_left_pop(Duration::from_secs(1), &keys).await?;
/// assert_eq!(popped.unwrap().value, "hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<HashMap<String, Entry>>,
    wakeup: Notify,
}

struct Entry {
    data: EntryData,
    expires_at: Option<Instant>,
}

enum EntryData {
    List(VecDeque<String>),
    Value(String),
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the remaining TTL of `key`, or `None` when the key is
    /// missing, already expired, or has no expiry set.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut state = self.inner.state.lock();
        purge(&mut state, now);
        state
            .get(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Returns the number of elements in the list at `key` (zero when the
    /// key is missing, expired, or not a list).
    pub fn list_len(&self, key: &str) -> usize {
        let mut state = self.inner.state.lock();
        purge(&mut state, Instant::now());
        match state.get(key) {
            Some(Entry {
                data: EntryData::List(items),
                ..
            }) => items.len(),
            _ => 0,
        }
    }

    /// Returns the plain value at `key`, if any.
    pub fn value_of(&self, key: &str) -> Option<String> {
        let mut state = self.inner.state.lock();
        purge(&mut state, Instant::now());
        match state.get(key) {
            Some(Entry {
                data: EntryData::Value(value),
                ..
            }) => Some(value.clone()),
            _ => None,
        }
    }

    fn try_pop(&self, keys: &[String]) -> Option<PoppedEntry> {
        let mut state = self.inner.state.lock();
        purge(&mut state, Instant::now());
        for key in keys {
            if let Some(Entry {
                data: EntryData::List(items),
                ..
            }) = state.get_mut(key)
            {
                if let Some(value) = items.pop_front() {
                    if items.is_empty() {
                        // Redis removes a list key when its last element
                        // is popped; keep the keyspace consistent.
                        state.remove(key);
                    }
                    return Some(PoppedEntry {
                        key: key.clone(),
                        value,
                    });
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MemoryStore")
            .field("keys", &state.len())
            .finish()
    }
}

fn purge(state: &mut HashMap<String, Entry>, now: Instant) {
    state.retain(|_, entry| match entry.expires_at {
        Some(at) => at > now,
        None => true,
    });
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn blocking_left_pop(
        &self,
        timeout: Duration,
        keys: &[String],
    ) -> Result<Option<PoppedEntry>, StoreError> {
        let deadline = Instant::now() + timeout;
        if keys.is_empty() {
            tokio::time::sleep_until(deadline).await;
            return Ok(None);
        }

        loop {
            let notified = self.inner.wakeup.notified();
            if let Some(entry) = self.try_pop(keys) {
                return Ok(Some(entry));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }

    async fn right_push_with_expire(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        {
            let now = Instant::now();
            let mut state = self.inner.state.lock();
            purge(&mut state, now);
            let entry = state.entry(key.to_string()).or_insert_with(|| Entry {
                data: EntryData::List(VecDeque::new()),
                expires_at: None,
            });
            match &mut entry.data {
                EntryData::List(items) => items.push_back(value.to_string()),
                EntryData::Value(_) => {
                    return Err(StoreError::new(format!(
                        "key {key} holds a non-list value"
                    )));
                }
            }
            entry.expires_at = Some(now + ttl);
        }
        self.inner.wakeup.notify_one();
        Ok(())
    }

    async fn set_with_expire(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        {
            let now = Instant::now();
            let mut state = self.inner.state.lock();
            purge(&mut state, now);
            state.insert(
                key.to_string(),
                Entry {
                    data: EntryData::Value(value.to_string()),
                    expires_at: Some(now + ttl),
                },
            );
        }
        self.inner.wakeup.notify_one();
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.inner.state.lock();
        purge(&mut state, Instant::now());
        Ok(state.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_push_then_pop() {
        let store = MemoryStore::new();
        store
            .right_push_with_expire("q", "a", Duration::from_secs(10))
            .await
            .unwrap();
        store
            .right_push_with_expire("q", "b", Duration::from_secs(10))
            .await
            .unwrap();

        let q = keys(&["q"]);
        let first = store
            .blocking_left_pop(Duration::from_millis(100), &q)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.value, "a");
        let second = store
            .blocking_left_pop(Duration::from_millis(100), &q)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.value, "b");
    }

    #[tokio::test]
    async fn test_pop_scans_keys_left_to_right() {
        let store = MemoryStore::new();
        store
            .right_push_with_expire("b", "from-b", Duration::from_secs(10))
            .await
            .unwrap();
        store
            .right_push_with_expire("a", "from-a", Duration::from_secs(10))
            .await
            .unwrap();

        let popped = store
            .blocking_left_pop(Duration::from_millis(100), &keys(&["a", "b"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped.key, "a");
        assert_eq!(popped.value, "from-a");
    }

    #[tokio::test]
    async fn test_pop_times_out_empty() {
        let store = MemoryStore::new();
        let popped = store
            .blocking_left_pop(Duration::from_millis(50), &keys(&["nothing"]))
            .await
            .unwrap();
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn test_pop_wakes_on_concurrent_push() {
        let store = MemoryStore::new();
        let pusher = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            pusher
                .right_push_with_expire("q", "late", Duration::from_secs(10))
                .await
                .unwrap();
        });

        let popped = store
            .blocking_left_pop(Duration::from_secs(5), &keys(&["q"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped.value, "late");
    }

    #[tokio::test]
    async fn test_ttl_is_tracked() {
        let store = MemoryStore::new();
        store
            .right_push_with_expire("q", "x", Duration::from_secs(10))
            .await
            .unwrap();
        let ttl = store.ttl("q").expect("key should have a TTL");
        assert!(ttl > Duration::ZERO && ttl <= Duration::from_secs(10));
        assert_eq!(store.ttl("missing"), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_purged() {
        let store = MemoryStore::new();
        store
            .right_push_with_expire("q", "x", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.list_len("q"), 0);
        assert!(!store.exists("q").await.unwrap());
    }

    #[tokio::test]
    async fn test_push_to_plain_value_is_rejected() {
        let store = MemoryStore::new();
        store
            .set_with_expire("k", "v", Duration::from_secs(10))
            .await
            .unwrap();
        let result = store
            .right_push_with_expire("k", "x", Duration::from_secs(10))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_and_exists() {
        let store = MemoryStore::new();
        store
            .set_with_expire("beat", "instance-1", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(store.exists("beat").await.unwrap());
        assert_eq!(store.value_of("beat"), Some("instance-1".to_string()));
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_key_set_waits_out_timeout() {
        let store = MemoryStore::new();
        let started = Instant::now();
        let popped = store
            .blocking_left_pop(Duration::from_millis(50), &[])
            .await
            .unwrap();
        assert!(popped.is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
