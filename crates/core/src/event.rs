// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages on the task and lifecycle streams.

use crate::worker::WorkerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single work item delivered to a worker's input stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// The prompt/instruction for the agent.
    pub content: String,
    /// Caller-side task handle, persisted for crash attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Caller-side request correlation handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl TaskMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), task_id: None, request_id: None }
    }
}

/// Phase of a worker's per-task lifecycle.
///
/// `started` precedes exactly one of `completed`/`failed` per task;
/// `stopped` marks wrapper shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Started,
    Completed,
    Failed,
    Stopped,
}

impl LifecyclePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker state announcement emitted by the wrapper on `worker:lifecycle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub worker_id: WorkerId,
    pub event: LifecyclePhase,
    pub timestamp: DateTime<Utc>,
    /// Agent output on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Agent exit code when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl LifecycleEvent {
    fn new(worker_id: WorkerId, event: LifecyclePhase) -> Self {
        Self {
            worker_id,
            event,
            timestamp: Utc::now(),
            result: None,
            error: None,
            exit_code: None,
        }
    }

    pub fn started(worker_id: WorkerId) -> Self {
        Self::new(worker_id, LifecyclePhase::Started)
    }

    pub fn completed(worker_id: WorkerId, result: Option<Value>) -> Self {
        Self { result, ..Self::new(worker_id, LifecyclePhase::Completed) }
    }

    pub fn failed(worker_id: WorkerId, error: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            error: Some(error.into()),
            exit_code,
            ..Self::new(worker_id, LifecyclePhase::Failed)
        }
    }

    pub fn stopped(worker_id: WorkerId) -> Self {
        Self::new(worker_id, LifecyclePhase::Stopped)
    }
}

/// Synthetic failure record appended to a worker's output stream when its
/// container dies outside wrapper control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashRecord {
    /// Always `"error"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Task attribution from the container label, when one was in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub content: String,
    /// Exit code as reported by the runtime event (string-typed there).
    pub exit_code: String,
}

impl CrashRecord {
    pub fn new(task_id: Option<String>, exit_code: impl std::fmt::Display) -> Self {
        let exit_code = exit_code.to_string();
        Self {
            kind: "error".to_string(),
            task_id,
            content: format!("Worker crashed with exit code {exit_code}"),
            exit_code,
        }
    }
}

/// Fallback payload published when agent stdout carries no result block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOutput {
    pub raw_output: String,
    /// Always `"no_structured_result"`.
    pub status: String,
}

impl RawOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self { raw_output: stdout.into(), status: "no_structured_result".to_string() }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
