// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supported CLI agent families.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A CLI-agent family a worker can run.
///
/// The kind selects the runner used by the wrapper and participates in the
/// image cache key: identical capability sets for different kinds build
/// different images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Claude Code (`claude` binary).
    Claude,
    /// Factory Droid (`droid` binary).
    Factory,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Factory => "factory",
        }
    }

    /// The executable the wrapper spawns for this family.
    pub fn cli_binary(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Factory => "droid",
        }
    }

    /// Whether the agent CLI allocates its own session ids.
    ///
    /// Families that do (Claude) reject externally supplied ids, so the
    /// wrapper must not pre-generate one: it runs the first turn without
    /// `--resume` and captures the id from the agent's JSON output.
    pub fn manages_own_session(self) -> bool {
        matches!(self, Self::Claude)
    }

    /// Whether the family supports resuming a prior conversation.
    pub fn supports_resume(self) -> bool {
        matches!(self, Self::Claude)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = UnknownAgentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "factory" => Ok(Self::Factory),
            _ => Err(UnknownAgentKind(s.to_string())),
        }
    }
}

/// Error for unrecognized agent kind strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent kind: {0}")]
pub struct UnknownAgentKind(pub String);

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
