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

//! Store error type.

use std::fmt;

/// Error raised by a store operation.
///
/// Covers connection failures, command rejections, and protocol-level
/// trouble in the underlying client. Callers generally cannot recover a
/// specific cause from here; the original error is retained as the
/// source for logging and diagnosis.
///
/// # Examples
///
/// ```rust
/// use redrpc::StoreError;
/// use std::io;
///
/// let plain = StoreError::new("connection refused");
/// assert!(plain.to_string().contains("connection refused"));
///
/// let io_error = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
/// let chained = StoreError::with_source("write failed", io_error);
/// assert!(std::error::Error::source(&chained).is_some());
/// ```
#[derive(Debug)]
pub struct StoreError {
    /// What the store was doing when it failed.
    message: String,
    /// The underlying client error, if any.
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Creates a store error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a store error with a message and an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {source})")?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_new_has_no_source() {
        let error = StoreError::new("nope");
        assert!(error.source().is_none());
        assert_eq!(error.to_string(), "nope");
    }

    #[test]
    fn test_with_source_chains() {
        let io_error = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        let error = StoreError::with_source("pop failed", io_error);
        assert!(error.source().is_some());
        assert!(error.to_string().contains("pop failed"));
        assert!(error.to_string().contains("timed out"));
    }
}
