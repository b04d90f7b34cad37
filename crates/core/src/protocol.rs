// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command/response protocol on the command bus.
//!
//! Serializes with `{"command": "create", ...fields}` format; each entry
//! travels inside a single `data` field on the stream. Responses mirror
//! commands: same tag, same `request_id`, a `success` flag, and either the
//! command-specific payload or an `error` string.

use crate::config::WorkerConfig;
use crate::worker::{WorkerId, WorkerState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_tail() -> u32 {
    100
}

/// A command consumed by the worker manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Create {
        request_id: String,
        config: WorkerConfig,
    },
    Delete {
        request_id: String,
        worker_id: WorkerId,
    },
    Status {
        request_id: String,
        worker_id: WorkerId,
    },
    SendCommand {
        request_id: String,
        worker_id: WorkerId,
        shell_command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_seconds: Option<u64>,
    },
    SendFile {
        request_id: String,
        worker_id: WorkerId,
        path: String,
        content: String,
    },
    GetLogs {
        request_id: String,
        worker_id: WorkerId,
        #[serde(default = "default_tail")]
        tail: u32,
    },
}

impl Command {
    pub fn request_id(&self) -> &str {
        match self {
            Self::Create { request_id, .. }
            | Self::Delete { request_id, .. }
            | Self::Status { request_id, .. }
            | Self::SendCommand { request_id, .. }
            | Self::SendFile { request_id, .. }
            | Self::GetLogs { request_id, .. } => request_id,
        }
    }

    /// The worker this command targets; `None` for `create` (the worker
    /// does not exist yet).
    pub fn worker_id(&self) -> Option<&WorkerId> {
        match self {
            Self::Create { .. } => None,
            Self::Delete { worker_id, .. }
            | Self::Status { worker_id, .. }
            | Self::SendCommand { worker_id, .. }
            | Self::SendFile { worker_id, .. }
            | Self::GetLogs { worker_id, .. } => Some(worker_id),
        }
    }

    /// Build the failure response matching this command's variant.
    pub fn failure(&self, error: impl Into<String>) -> Response {
        let request_id = self.request_id().to_string();
        let error = Some(error.into());
        match self {
            Self::Create { .. } => Response::Create {
                request_id,
                success: false,
                worker_id: None,
                error,
            },
            Self::Delete { .. } => Response::Delete { request_id, success: false, error },
            Self::Status { .. } => Response::Status {
                request_id,
                success: false,
                state: None,
                created_at: None,
                last_activity_at: None,
                error,
            },
            Self::SendCommand { .. } => Response::SendCommand {
                request_id,
                success: false,
                exit_code: None,
                stdout: None,
                stderr: None,
                error,
            },
            Self::SendFile { .. } => Response::SendFile { request_id, success: false, error },
            Self::GetLogs { .. } => Response::GetLogs {
                request_id,
                success: false,
                logs: None,
                error,
            },
        }
    }
}

/// Reply published to the caller's response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Response {
    Create {
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<WorkerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Delete {
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Status {
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<WorkerState>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        created_at: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_activity_at: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SendCommand {
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stdout: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SendFile {
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    GetLogs {
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        logs: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Structured failure for entries that parse as no known command.
    /// `request_id` is whatever could be recovered from the raw entry.
    Error {
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Response {
    pub fn request_id(&self) -> &str {
        match self {
            Self::Create { request_id, .. }
            | Self::Delete { request_id, .. }
            | Self::Status { request_id, .. }
            | Self::SendCommand { request_id, .. }
            | Self::SendFile { request_id, .. }
            | Self::GetLogs { request_id, .. }
            | Self::Error { request_id, .. } => request_id,
        }
    }

    pub fn success(&self) -> bool {
        match self {
            Self::Create { success, .. }
            | Self::Delete { success, .. }
            | Self::Status { success, .. }
            | Self::SendCommand { success, .. }
            | Self::SendFile { success, .. }
            | Self::GetLogs { success, .. }
            | Self::Error { success, .. } => *success,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Create { error, .. }
            | Self::Delete { error, .. }
            | Self::Status { error, .. }
            | Self::SendCommand { error, .. }
            | Self::SendFile { error, .. }
            | Self::GetLogs { error, .. }
            | Self::Error { error, .. } => error.as_deref(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "protocol_property_tests.rs"]
mod property_tests;
