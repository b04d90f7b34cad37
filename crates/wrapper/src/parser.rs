// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result extraction from agent stdout.
//!
//! The agent signals a structured result with a block delimited by the
//! literal markers `<result>` and `</result>`; the inner text must be one
//! JSON value. The first block wins. CLI agents that wrap their output in
//! a JSON envelope (`{"result": "...<result>...</result>...", ...}`) are
//! unwrapped first and the same extraction applied to the envelope's
//! `result` text.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// Opening marker, case-sensitive.
pub const RESULT_OPEN: &str = "<result>";
/// Closing marker, case-sensitive.
pub const RESULT_CLOSE: &str = "</result>";

static RESULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Constant pattern, cannot fail at runtime.
    match Regex::new(r"(?s)<result>\s*(.*?)\s*</result>") {
        Ok(re) => re,
        Err(_) => unreachable!("constant regex pattern is valid"),
    }
});

/// Errors from result extraction. Treated like an agent failure: the
/// task's lifecycle ends in `failed` and nothing is published.
#[derive(Debug, Error)]
pub enum ResultParseError {
    #[error("invalid JSON in result block: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Extract the structured result from agent stdout.
///
/// `Ok(None)` means no markers were found (the caller publishes the raw
/// fallback); `Err` means a block was present but its content was not a
/// single JSON value.
pub fn extract_result(stdout: &str) -> Result<Option<Value>, ResultParseError> {
    // Unwrap the common CLI envelope first: the markers then live inside
    // the envelope's `result` string, where quotes are JSON-escaped and
    // the block is only parseable after unescaping.
    if let Ok(Value::Object(envelope)) = serde_json::from_str::<Value>(stdout.trim()) {
        if let Some(Value::String(text)) = envelope.get("result") {
            if text.contains(RESULT_OPEN) {
                return extract_block(text);
            }
        }
    }
    extract_block(stdout)
}

fn extract_block(text: &str) -> Result<Option<Value>, ResultParseError> {
    match RESULT_RE.captures(text) {
        None => Ok(None),
        Some(captures) => {
            let inner = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            Ok(Some(serde_json::from_str(inner)?))
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
