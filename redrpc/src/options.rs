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

//! Configuration for clients and servers.
//!
//! [`Options`] is an immutable bundle captured by value at construction.
//! Every field has a default; an empty prefix or a zero duration is
//! treated as absent and mapped back to its default, so partially filled
//! bundles behave predictably.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default queue-name prefix.
pub const DEFAULT_PREFIX: &str = "redis_rpc";

/// Default TTL applied to call-queue keys on each enqueue.
pub const DEFAULT_REQUEST_EXPIRE: Duration = Duration::from_secs(120);

/// Default TTL applied to response-queue keys on each publish.
pub const DEFAULT_RESULT_EXPIRE: Duration = Duration::from_secs(120);

/// Default client deadline for receiving a response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default upper bound on each individual blocking pop.
///
/// This bounds the worst-case latency of observing a close request, on
/// both the client wait loop and the server dispatch loop.
pub const DEFAULT_BLOCKING_POP_TIMEOUT: Duration = Duration::from_secs(1);

/// Default interval between heartbeat refreshes for named servers.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(5);

/// Default TTL on the heartbeat key.
///
/// Three periods, so one missed refresh (the loop can lag a refresh by up
/// to one blocking-pop timeout) does not flap the liveness signal.
pub const DEFAULT_HEARTBEAT_EXPIRE: Duration = Duration::from_secs(15);

/// An injectable clock used for the `ts` fields on the wire.
///
/// Deadlines and TTLs always use the monotonic clock; the time source
/// only controls the timestamps written into envelopes, which makes wire
/// output reproducible in tests.
///
/// # Examples
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use redrpc::TimeSource;
///
/// let fixed = TimeSource::fixed(Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap());
/// assert_eq!(fixed.timestamp(), "2018-01-01T00:00:00Z");
/// ```
#[derive(Clone)]
pub struct TimeSource(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl TimeSource {
    /// The system UTC clock.
    pub fn system() -> Self {
        Self(Arc::new(Utc::now))
    }

    /// A clock frozen at the given instant. Intended for tests.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self(Arc::new(move || at))
    }

    /// A clock backed by an arbitrary function.
    pub fn from_fn(f: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Returns the current time according to this source.
    pub fn now(&self) -> DateTime<Utc> {
        (self.0)()
    }

    /// Renders the current time as an RFC-3339 string with seconds
    /// precision and a `Z` suffix, e.g. `2018-01-01T00:00:00Z`.
    pub fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for TimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TimeSource(..)")
    }
}

/// Configuration bundle for [`Client`](crate::Client) and
/// [`Server`](crate::Server).
///
/// Captured by value at construction; post-construction mutation is not
/// possible through either type.
///
/// # Examples
///
/// ```rust
/// use redrpc::Options;
/// use std::time::Duration;
///
/// let options = Options::new()
///     .with_prefix("rpc_example")
///     .with_response_timeout(Duration::from_secs(5));
/// assert_eq!(options.prefix, "rpc_example");
/// ```
#[derive(Clone, Debug)]
pub struct Options {
    /// Namespace prepended to every queue and key name.
    ///
    /// Default: `redis_rpc`
    pub prefix: String,

    /// TTL applied to the call-queue key on each enqueue.
    ///
    /// Default: 120 seconds
    pub request_expire: Duration,

    /// TTL applied to the response-queue key on each publish.
    ///
    /// Default: 120 seconds
    pub result_expire: Duration,

    /// Client deadline for receiving a response.
    ///
    /// Default: 1 second
    pub response_timeout: Duration,

    /// Upper bound on each individual blocking pop.
    ///
    /// Also bounds close-observation latency on both loops.
    ///
    /// Default: 1 second
    pub blocking_pop_timeout: Duration,

    /// Clock used for the `ts` fields on the wire.
    ///
    /// Default: the system UTC clock
    pub time_source: TimeSource,

    /// Presence name for the server.
    ///
    /// When set, the server refreshes `<prefix>:heartbeat:<name>` from its
    /// run loop so clients can probe liveness. `None` disables heartbeats.
    ///
    /// Default: `None`
    pub server_name: Option<String>,

    /// Interval between heartbeat refreshes.
    ///
    /// Default: 5 seconds
    pub heartbeat_period: Duration,

    /// TTL on the heartbeat key.
    ///
    /// Default: 15 seconds
    pub heartbeat_expire: Duration,

    /// Maximum number of messages the server run loop handles before
    /// returning. `None` serves until closed.
    ///
    /// Default: `None`
    pub serve_limit: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            request_expire: DEFAULT_REQUEST_EXPIRE,
            result_expire: DEFAULT_RESULT_EXPIRE,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            blocking_pop_timeout: DEFAULT_BLOCKING_POP_TIMEOUT,
            time_source: TimeSource::system(),
            server_name: None,
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
            heartbeat_expire: DEFAULT_HEARTBEAT_EXPIRE,
            serve_limit: None,
        }
    }
}

impl Options {
    /// Creates an options bundle with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the queue-name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the TTL applied to call-queue keys.
    pub fn with_request_expire(mut self, ttl: Duration) -> Self {
        self.request_expire = ttl;
        self
    }

    /// Sets the TTL applied to response-queue keys.
    pub fn with_result_expire(mut self, ttl: Duration) -> Self {
        self.result_expire = ttl;
        self
    }

    /// Sets the client deadline for receiving a response.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the per-pop blocking bound.
    pub fn with_blocking_pop_timeout(mut self, timeout: Duration) -> Self {
        self.blocking_pop_timeout = timeout;
        self
    }

    /// Sets the clock used for wire timestamps.
    pub fn with_time_source(mut self, time_source: TimeSource) -> Self {
        self.time_source = time_source;
        self
    }

    /// Sets the presence name under which a server heartbeats.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Sets the interval between heartbeat refreshes.
    pub fn with_heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    /// Sets the TTL on the heartbeat key.
    pub fn with_heartbeat_expire(mut self, ttl: Duration) -> Self {
        self.heartbeat_expire = ttl;
        self
    }

    /// Sets the maximum number of messages the run loop handles.
    pub fn with_serve_limit(mut self, limit: u64) -> Self {
        self.serve_limit = Some(limit);
        self
    }

    /// Maps absent-equivalent values back to their defaults.
    ///
    /// An empty prefix and zero-valued durations are treated as absent.
    /// [`Client`](crate::Client) and [`Server`](crate::Server) apply this
    /// at construction, so a bundle built with struct-update syntax from
    /// zeroed fields still behaves.
    #[must_use]
    pub fn or_defaults(mut self) -> Self {
        if self.prefix.is_empty() {
            self.prefix = DEFAULT_PREFIX.to_string();
        }
        if self.request_expire.is_zero() {
            self.request_expire = DEFAULT_REQUEST_EXPIRE;
        }
        if self.result_expire.is_zero() {
            self.result_expire = DEFAULT_RESULT_EXPIRE;
        }
        if self.response_timeout.is_zero() {
            self.response_timeout = DEFAULT_RESPONSE_TIMEOUT;
        }
        if self.blocking_pop_timeout.is_zero() {
            self.blocking_pop_timeout = DEFAULT_BLOCKING_POP_TIMEOUT;
        }
        if self.heartbeat_period.is_zero() {
            self.heartbeat_period = DEFAULT_HEARTBEAT_PERIOD;
        }
        if self.heartbeat_expire.is_zero() {
            self.heartbeat_expire = DEFAULT_HEARTBEAT_EXPIRE;
        }
        self
    }
}
