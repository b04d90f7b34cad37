// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock seam for the reapers.
//!
//! TTL expiry, idle-pause, and image GC all compare "now" against stored
//! instants; routing time through a trait lets the reaper tests advance a
//! fake clock instead of sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Seconds since the Unix epoch, for wall-clock stamps persisted to
    /// the broker (image LRU).
    fn unix_seconds(&self) -> u64;
}

/// The real clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_seconds(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }
}

/// Controllable clock for tests. `advance` moves both the monotonic and
/// the wall reading.
#[derive(Clone)]
pub struct FakeClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
    unix_base: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
            unix_base: Arc::new(Mutex::new(1_700_000_000)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }

    fn unix_seconds(&self) -> u64 {
        *self.unix_base.lock() + self.offset.lock().as_secs()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
