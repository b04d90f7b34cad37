// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker stream and key naming.
//!
//! All cross-process names are derived here from a single configurable
//! prefix, so no component hard-codes a topology string.

use crate::config::WorkerType;
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};

/// Default prefix for all streams and keys.
pub const DEFAULT_PREFIX: &str = "worker";

/// Consumer group the manager fleet uses on the command stream.
pub const COMMAND_GROUP: &str = "worker_manager";

/// Consumer group the manager uses on the lifecycle stream.
pub const LIFECYCLE_GROUP: &str = "worker_manager";

/// Naming scheme for every stream and key the subsystem touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamNames {
    prefix: String,
}

impl Default for StreamNames {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl StreamNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The command bus consumed by the manager fleet.
    pub fn commands(&self) -> String {
        format!("{}:commands", self.prefix)
    }

    /// Response stream for a caller family.
    pub fn responses(&self, worker_type: WorkerType) -> String {
        format!("{}:responses:{}", self.prefix, worker_type)
    }

    /// Response stream used when the caller family cannot be determined.
    pub fn responses_fallback(&self) -> String {
        self.responses(WorkerType::default())
    }

    /// Per-worker task feed, consumed by that worker's wrapper.
    pub fn input(&self, worker_id: &WorkerId) -> String {
        format!("{}:{}:input", self.prefix, worker_id)
    }

    /// Per-worker result stream, written by the wrapper (and by the event
    /// listener for crash synthesis).
    pub fn output(&self, worker_id: &WorkerId) -> String {
        format!("{}:{}:output", self.prefix, worker_id)
    }

    /// Consumer group name for a worker's input stream.
    pub fn input_group(&self, worker_id: &WorkerId) -> String {
        format!("{}-group", worker_id)
    }

    /// Lifecycle event stream shared by all workers.
    pub fn lifecycle(&self) -> String {
        format!("{}:lifecycle", self.prefix)
    }

    /// TTL key holding a worker's agent session id.
    pub fn session_key(&self, worker_id: &WorkerId) -> String {
        format!("{}:session:{}", self.prefix, worker_id)
    }

    /// Hash carrying the wrapper's current task attribution, read by the
    /// event listener when the container dies mid-task.
    pub fn status_key(&self, worker_id: &WorkerId) -> String {
        format!("{}:status:{}", self.prefix, worker_id)
    }

    /// Timestamp key backing the image LRU.
    pub fn image_lru_key(&self, image_tag: &str) -> String {
        format!("{}:image:last_used:{}", self.prefix, image_tag)
    }

    /// Scan pattern matching every image LRU key.
    pub fn image_lru_pattern(&self) -> String {
        format!("{}:image:last_used:*", self.prefix)
    }

    /// Extract the image tag back out of an LRU key.
    pub fn image_tag_from_lru_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(&format!("{}:image:last_used:", self.prefix))
    }

    /// Spawner's principal→worker mapping key.
    pub fn principal_map_key(&self, principal_id: &str) -> String {
        format!("{}:principal:{}", self.prefix, principal_id)
    }
}

/// Container name for a worker: `<container_prefix>-<worker_id>`.
pub fn container_name(container_prefix: &str, worker_id: &WorkerId) -> String {
    format!("{}-{}", container_prefix, worker_id)
}

#[cfg(test)]
#[path = "streams_tests.rs"]
mod tests;
