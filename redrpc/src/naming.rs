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

//! Deterministic queue and key name derivation.
//!
//! All coordination between clients and servers happens through store keys
//! whose names are pure functions of the configured prefix, the method
//! name, and (for responses) the request id. Both sides derive names
//! independently; nothing is negotiated at runtime.

/// Returns the call queue name for a method: `<prefix>:<method>:calls`.
///
/// Clients push request envelopes onto this list; servers consume it.
///
/// # Examples
///
/// ```rust
/// use redrpc::naming::call_queue_name;
///
/// assert_eq!(call_queue_name("redis_rpc", "get"), "redis_rpc:get:calls");
/// ```
pub fn call_queue_name(prefix: &str, method: &str) -> String {
    format!("{prefix}:{method}:calls")
}

/// Returns the response queue name for a request:
/// `<prefix>:<method>:result:<request-id>`.
///
/// A request id appears in at most one response queue name, so the client
/// that generated the id is the only consumer of this list.
///
/// # Examples
///
/// ```rust
/// use redrpc::naming::response_queue_name;
///
/// assert_eq!(
///     response_queue_name("redis_rpc", "get", "1f0d3a50-0000-4000-8000-000000000000"),
///     "redis_rpc:get:result:1f0d3a50-0000-4000-8000-000000000000",
/// );
/// ```
pub fn response_queue_name(prefix: &str, method: &str, request_id: &str) -> String {
    format!("{prefix}:{method}:result:{request_id}")
}

/// Returns the heartbeat key for a named server:
/// `<prefix>:heartbeat:<server-name>`.
///
/// Servers configured with a name refresh this key with their instance id
/// and a short TTL; clients probe it to learn whether any server with that
/// name is alive.
///
/// # Examples
///
/// ```rust
/// use redrpc::naming::heartbeat_key_name;
///
/// assert_eq!(heartbeat_key_name("redis_rpc", "kv"), "redis_rpc:heartbeat:kv");
/// ```
pub fn heartbeat_key_name(prefix: &str, server_name: &str) -> String {
    format!("{prefix}:heartbeat:{server_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_queue_name() {
        assert_eq!(call_queue_name("redis_rpc", "get"), "redis_rpc:get:calls");
        assert_eq!(call_queue_name("rpc_example", "set"), "rpc_example:set:calls");
    }

    #[test]
    fn test_response_queue_name() {
        assert_eq!(
            response_queue_name("redis_rpc", "get", "abc-123"),
            "redis_rpc:get:result:abc-123",
        );
    }

    #[test]
    fn test_heartbeat_key_name() {
        assert_eq!(heartbeat_key_name("redis_rpc", "kv"), "redis_rpc:heartbeat:kv");
    }

    #[test]
    fn test_names_are_deterministic() {
        assert_eq!(
            call_queue_name("p", "m"),
            call_queue_name("p", "m"),
        );
        assert_eq!(
            response_queue_name("p", "m", "id"),
            response_queue_name("p", "m", "id"),
        );
    }
}
