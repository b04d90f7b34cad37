// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker configuration: the input to the `create` command.

use crate::agent::AgentKind;
use crate::capability::Capability;
use crate::tools::ToolGroup;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Maximum worker name length (DNS label territory).
pub const MAX_NAME_LEN: usize = 253;

/// How the worker container authenticates to its agent's API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Bind-mount the host session directory read-only.
    HostSession,
    /// Inject an API key env var.
    ApiKey,
    /// No credentials injected.
    #[default]
    None,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HostSession => "host_session",
            Self::ApiKey => "api_key",
            Self::None => "none",
        })
    }
}

/// Caller family a worker belongs to; selects its response stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerType {
    /// Product-owner side callers. Also the routing fallback.
    #[default]
    Po,
    Developer,
}

impl WorkerType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Po => "po",
            Self::Developer => "developer",
        }
    }
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the `create` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker name; becomes the `worker_id` and derives the container name.
    pub name: String,
    pub agent_type: AgentKind,
    #[serde(default)]
    pub worker_type: WorkerType,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub auth_mode: AuthMode,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    #[serde(default)]
    pub allowed_tools: Vec<ToolGroup>,
    /// Mount the host session directory even when `auth_mode` is not
    /// `host_session` (development convenience carried on the wire).
    #[serde(default)]
    pub mount_session_volume: bool,
    /// Host path of the session directory to mount; defaults to `~/.claude`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_claude_dir: Option<PathBuf>,
    /// Opaque instruction text forwarded to the agent.
    #[serde(default)]
    pub instructions: String,
}

fn default_ttl_hours() -> u32 {
    24
}

impl WorkerConfig {
    pub fn new(name: impl Into<String>, agent_type: AgentKind) -> Self {
        Self {
            name: name.into(),
            agent_type,
            worker_type: WorkerType::default(),
            capabilities: Vec::new(),
            auth_mode: AuthMode::default(),
            ttl_hours: default_ttl_hours(),
            env_vars: HashMap::new(),
            allowed_tools: Vec::new(),
            mount_session_volume: false,
            host_claude_dir: None,
            instructions: String::new(),
        }
    }

    /// Absolute worker lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_hours) * 3600)
    }

    /// Whether the host session directory should be mounted.
    pub fn wants_session_mount(&self) -> bool {
        self.mount_session_volume || self.auth_mode == AuthMode::HostSession
    }

    /// Validate the config before any state is mutated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(ConfigError::NameTooLong { len: self.name.len() });
        }
        if let Some(bad) = self
            .name
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(ConfigError::InvalidNameChar { ch: bad });
        }
        if self.ttl_hours < 1 {
            return Err(ConfigError::TtlTooShort { hours: self.ttl_hours });
        }
        Ok(())
    }
}

/// Validation errors for a worker config. Fatal before any state mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("worker name must not be empty")]
    EmptyName,

    #[error("worker name exceeds {MAX_NAME_LEN} bytes ({len})")]
    NameTooLong { len: usize },

    #[error("worker name may only contain [a-z0-9-], found {ch:?}")]
    InvalidNameChar { ch: char },

    #[error("ttl_hours must be at least 1, got {hours}")]
    TtlTooShort { hours: u32 },
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
