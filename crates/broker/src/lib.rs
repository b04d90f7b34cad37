// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wharf-broker: the stream/KV client every Wharf process talks through.
//!
//! Thin, opinionated layer over Redis: streams with consumer groups for
//! the command/task/lifecycle buses, TTL keys for sessions and the image
//! LRU, hashes for crash attribution. The broker is the only cross-process
//! mutable store in the system.
//!
//! Wire convention: entries are written as a single `data` field holding a
//! JSON blob. Readers additionally accept entries whose fields are spread
//! out as named key/value pairs, since some producers in the wider system
//! still emit that form.

mod client;
mod entry;
mod retry;

pub use client::Broker;
pub use entry::{DecodeError, StreamEntry, DATA_FIELD};
pub use retry::{backoff_delay, RetryBudget};

use thiserror::Error;

/// Errors from broker operations. A `Redis` error surfacing from a write
/// means the bounded retry budget is already spent.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("malformed stream entry: {0}")]
    Decode(#[from] DecodeError),
}
