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

//! The error taxonomy exposed to callers.
//!
//! The two user-facing kinds, *timeout* and *remote exception*, are
//! distinguishable structurally — match on the variant or use the `is_*`
//! predicates, never the rendered message. Transport and encoding
//! failures surface as the two wrapped variants.

use crate::store::StoreError;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// Top-level error type for RPC operations.
///
/// # Examples
///
/// ```rust
/// use redrpc::RpcError;
/// use std::time::Duration;
///
/// fn classify(error: &RpcError) -> &'static str {
///     if error.is_timeout() {
///         "no response in time"
///     } else if error.is_remote_exception() {
///         "the handler failed"
///     } else {
///         "transport or encoding trouble"
///     }
/// }
///
/// let timeout = RpcError::Timeout { waited: Duration::from_secs(1) };
/// assert_eq!(classify(&timeout), "no response in time");
/// ```
#[derive(Debug)]
pub enum RpcError {
    /// The client deadline elapsed without a response.
    ///
    /// The request may still be executed by a server; any late response is
    /// left on its queue to expire.
    Timeout {
        /// The deadline that elapsed.
        waited: Duration,
    },

    /// The server published an error envelope: the handler returned an
    /// error, panicked, or aborted.
    Remote {
        /// The server-supplied message, verbatim.
        message: String,
    },

    /// A store operation failed.
    Store(StoreError),

    /// Encoding a request or decoding our own data failed.
    Codec(serde_json::Error),
}

impl RpcError {
    /// Returns `true` if the client deadline elapsed without a response.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the server reported a failure for this request.
    #[must_use]
    pub const fn is_remote_exception(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Returns the verbatim server-supplied message for remote failures.
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Remote { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { waited } => {
                write!(f, "timed out after {waited:?} waiting for a response")
            }
            Self::Remote { message } => write!(f, "remote exception: {message}"),
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::Codec(e) => write!(f, "codec error: {e}"),
        }
    }
}

impl StdError for RpcError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Timeout { .. } | Self::Remote { .. } => None,
            Self::Store(e) => Some(e),
            Self::Codec(e) => Some(e),
        }
    }
}

impl From<StoreError> for RpcError {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(error: serde_json::Error) -> Self {
        Self::Codec(error)
    }
}
