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

//! The store abstraction and its implementations.
//!
//! The runtime depends on a deliberately small interface over a Redis-like
//! store: a blocking left pop across several keys, and an append that sets
//! a key TTL in the same pipeline. Two implementations ship here:
//!
//! - [`RedisStore`]: the production adapter over a real Redis instance
//! - [`MemoryStore`]: a cloneable in-process twin for tests
//!
//! All durations crossing the store boundary convert to whole seconds,
//! rounded up, because the underlying commands take integral seconds.

mod error;
mod memory;
mod redis;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use traits::{PoppedEntry, StoreAdapter};

use std::time::Duration;

/// Converts a duration to whole seconds, rounding up.
///
/// Store commands take integral seconds; rounding up keeps a sub-second
/// TTL or timeout from collapsing to "no expiry" or "block forever".
///
/// # Examples
///
/// ```rust
/// use redrpc::store::whole_seconds;
/// use std::time::Duration;
///
/// assert_eq!(whole_seconds(Duration::from_secs(10)), 10);
/// assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
/// assert_eq!(whole_seconds(Duration::from_millis(1)), 1);
/// assert_eq!(whole_seconds(Duration::ZERO), 0);
/// ```
pub fn whole_seconds(duration: Duration) -> u64 {
    let mut seconds = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        seconds += 1;
    }
    seconds
}
