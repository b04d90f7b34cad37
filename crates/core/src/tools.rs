// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool groups a worker's agent may call back into.
//!
//! `allowed_tools` on a worker config restricts which orchestrator CLI
//! subcommand groups the in-container agent is told it can use. The set is
//! carried into the container as an env var; enforcement is the agent
//! CLI's concern.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An orchestrator CLI tool group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolGroup {
    Project,
    Deploy,
    Engineering,
    Infra,
    Diagnose,
    /// Special: the respond-to-user capability.
    Respond,
}

impl ToolGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Deploy => "deploy",
            Self::Engineering => "engineering",
            Self::Infra => "infra",
            Self::Diagnose => "diagnose",
            Self::Respond => "respond",
        }
    }
}

impl fmt::Display for ToolGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolGroup {
    type Err = UnknownToolGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "deploy" => Ok(Self::Deploy),
            "engineering" => Ok(Self::Engineering),
            "infra" => Ok(Self::Infra),
            "diagnose" => Ok(Self::Diagnose),
            "respond" => Ok(Self::Respond),
            _ => Err(UnknownToolGroup(s.to_string())),
        }
    }
}

/// Error for unrecognized tool group strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool group: {0}")]
pub struct UnknownToolGroup(pub String);

/// Join a tool-group list into the comma-separated env var form.
pub fn join(groups: &[ToolGroup]) -> String {
    groups.iter().map(|g| g.as_str()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
