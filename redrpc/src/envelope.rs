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

//! Request and response envelopes and their JSON codec.
//!
//! Envelopes are the only things that cross the wire. A request carries an
//! `id`, a timestamp, and a keyword-argument mapping; a response carries a
//! timestamp and either a result (`res`) or an error message (`err`).
//! Unknown fields are ignored on decode, which keeps the protocol forward
//! compatible, and envelopes are immutable once encoded.
//!
//! Decoding *floatifies* every numeric value: integer literals on the wire
//! become `f64`-backed numbers, so `123` decodes equal to `123.0`. The
//! protocol is shared with dynamically typed peers whose JSON decoders
//! produce doubles; normalizing here keeps every consumer observing the
//! same values.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Keyword arguments for a call: a mapping from argument name to a
/// schemaless JSON value. Insertion order is not significant.
pub type Kwargs = serde_json::Map<String, Value>;

/// The request envelope pushed onto a call queue.
///
/// On the wire this is a JSON object with exactly three recognized fields:
///
/// ```text
/// {"id":"<uuid4>","ts":"<RFC3339>","kw":{"k":"k1","v":123}}
/// ```
///
/// `id` is a lowercase hyphenated UUIDv4 generated by the client and is
/// the sole correlation between a request and its response. `ts` is the
/// client-side submission timestamp, carried as opaque metadata. `kw`
/// defaults to an empty mapping when absent.
///
/// # Examples
///
/// ```rust
/// use redrpc::envelope::RequestEnvelope;
///
/// let envelope = RequestEnvelope::decode(r#"{"id":"abc","ts":"t","kw":{"n":123}}"#).unwrap();
/// assert_eq!(envelope.id, "abc");
/// assert_eq!(envelope.kw["n"], serde_json::json!(123.0));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Unique request id, generated by the client.
    pub id: String,
    /// Client-side submission timestamp, RFC-3339.
    pub ts: String,
    /// Keyword arguments for the handler.
    #[serde(default)]
    pub kw: Kwargs,
}

impl RequestEnvelope {
    /// Creates a request envelope from its parts.
    pub fn new(id: impl Into<String>, ts: impl Into<String>, kw: Kwargs) -> Self {
        Self {
            id: id.into(),
            ts: ts.into(),
            kw,
        }
    }

    /// Encodes the envelope as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying serialization error; in practice only
    /// non-string map keys or non-finite floats can fail here.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes an envelope from JSON text and floatifies its argument
    /// values.
    ///
    /// Unknown fields are ignored; a missing `kw` decodes as an empty
    /// mapping. A missing `id` or `ts` is a decode error.
    ///
    /// # Errors
    ///
    /// Returns the underlying deserialization error for malformed JSON or
    /// missing required fields.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let mut envelope: Self = serde_json::from_str(text)?;
        for value in envelope.kw.values_mut() {
            floatify(value);
        }
        Ok(envelope)
    }
}

/// The response envelope pushed onto a response queue.
///
/// Exactly one of two shapes, distinguished by the presence of `err`:
///
/// ```text
/// {"ts":"<RFC3339>","res":<json-value>}
/// {"ts":"<RFC3339>","err":"<message>"}
/// ```
///
/// When a payload carries both fields, `err` takes precedence. A payload
/// carrying neither is rejected as malformed; note that `res: null` is a
/// valid success and is distinct from an absent `res`.
///
/// The precedence and rejection rules fall out of the variant order of
/// this untagged enum: decoding tries [`ResponseEnvelope::Failure`] first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    /// The handler failed; `err` carries the server-supplied message.
    Failure {
        /// Server-side publication timestamp, RFC-3339.
        ts: String,
        /// Human-readable failure message, delivered to the caller verbatim.
        err: String,
    },
    /// The handler succeeded; `res` carries its result (possibly `null`).
    Success {
        /// Server-side publication timestamp, RFC-3339.
        ts: String,
        /// Handler result value.
        res: Value,
    },
}

impl ResponseEnvelope {
    /// Creates a success envelope.
    pub fn success(ts: impl Into<String>, res: Value) -> Self {
        Self::Success { ts: ts.into(), res }
    }

    /// Creates a failure envelope.
    pub fn failure(ts: impl Into<String>, err: impl Into<String>) -> Self {
        Self::Failure {
            ts: ts.into(),
            err: err.into(),
        }
    }

    /// Returns `true` for failure envelopes.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Encodes the envelope as compact JSON.
    ///
    /// Success envelopes serialize with field order `ts`, `res`; failures
    /// with `ts`, `err`.
    ///
    /// # Errors
    ///
    /// Returns the underlying serialization error.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes an envelope from JSON text and floatifies the result value.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error for malformed JSON and for payloads
    /// that carry neither `res` nor `err`.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let mut envelope: Self = serde_json::from_str(text)?;
        if let Self::Success { res, .. } = &mut envelope {
            floatify(res);
        }
        Ok(envelope)
    }
}

/// Rewrites every integer-backed number into its `f64` form, recursively
/// through arrays and objects. Integers beyond 2^53 lose precision, the
/// same way they do in every double-based JSON decoder on the other side
/// of the wire.
fn floatify(value: &mut Value) {
    match value {
        Value::Number(n) if !n.is_f64() => {
            if let Some(f) = n.as_f64().and_then(Number::from_f64) {
                *n = f;
            }
        }
        Value::Array(items) => {
            for item in items {
                floatify(item);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                floatify(item);
            }
        }
        _ => {}
    }
}
