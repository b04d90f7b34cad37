// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream entry decoding.
//!
//! Two wire conventions coexist in the wider system: a single `data` field
//! holding one JSON blob (what Wharf writes), and named fields spread
//! across the entry. Readers accept both; `data` wins when present.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// The field name carrying the JSON blob in the convention Wharf emits.
pub const DATA_FIELD: &str = "data";

/// One entry read from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Broker-assigned entry id (`<ms>-<seq>`).
    pub id: String,
    pub fields: Vec<(String, String)>,
}

/// Errors turning a stream entry into a typed message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("entry has no fields")]
    Empty,

    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl StreamEntry {
    pub fn new(id: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self { id: id.into(), fields }
    }

    /// Value of a named field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// The entry's payload as one JSON value: the `data` blob when
    /// present, otherwise the named fields as an object with each value
    /// re-parsed as JSON where possible.
    pub fn to_json(&self) -> Result<Value, DecodeError> {
        if let Some(data) = self.field(DATA_FIELD) {
            return Ok(serde_json::from_str(data)?);
        }
        if self.fields.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(Value::Object(
            self.fields
                .iter()
                .map(|(k, raw)| {
                    let value = serde_json::from_str::<Value>(raw)
                        .unwrap_or_else(|_| Value::String(raw.clone()));
                    (k.clone(), value)
                })
                .collect::<Map<_, _>>(),
        ))
    }

    /// Decode the entry into `T`, accepting both wire conventions.
    ///
    /// Named-field entries are tried as a string-valued object first, then
    /// with each value re-parsed as JSON so numbers, bools, and nested
    /// objects flattened into fields still deserialize.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        if let Some(data) = self.field(DATA_FIELD) {
            return Ok(serde_json::from_str(data)?);
        }
        if self.fields.is_empty() {
            return Err(DecodeError::Empty);
        }

        let as_strings = Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<Map<_, _>>(),
        );
        if let Ok(decoded) = serde_json::from_value(as_strings) {
            return Ok(decoded);
        }

        let coerced = Value::Object(
            self.fields
                .iter()
                .map(|(k, raw)| {
                    let value = serde_json::from_str::<Value>(raw)
                        .unwrap_or_else(|_| Value::String(raw.clone()));
                    (k.clone(), value)
                })
                .collect::<Map<_, _>>(),
        );
        Ok(serde_json::from_value(coerced)?)
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
