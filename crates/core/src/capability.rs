// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-time worker capabilities.
//!
//! Each capability enables a tool install in the worker image. "Simple"
//! capabilities are plain apt packages and collapse into one combined
//! install step; the rest carry their own multi-line install blocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A coarse feature tag enabling a build-time install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    Git,
    Curl,
    GithubCli,
    Docker,
}

/// Install block for the GitHub CLI, per the official apt instructions.
const GITHUB_CLI_INSTALL: &[&str] = &[
    "RUN apt-get update && apt-get install -y --no-install-recommends curl gpg && \\",
    "    curl -fsSL https://cli.github.com/packages/githubcli-archive-keyring.gpg | gpg --dearmor -o /usr/share/keyrings/githubcli-archive-keyring.gpg && \\",
    "    echo \"deb [arch=$(dpkg --print-architecture) signed-by=/usr/share/keyrings/githubcli-archive-keyring.gpg] https://cli.github.com/packages stable main\" | tee /etc/apt/sources.list.d/github-cli.list > /dev/null && \\",
    "    apt-get update && apt-get install -y --no-install-recommends gh && \\",
    "    rm -rf /var/lib/apt/lists/*",
];

/// Docker CLI only — the socket is mounted at runtime.
const DOCKER_CLI_INSTALL: &[&str] = &[
    "RUN apt-get update && apt-get install -y --no-install-recommends docker.io && rm -rf /var/lib/apt/lists/*",
];

impl Capability {
    /// Canonical upper-case name used in the image hash and env vars.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Git => "GIT",
            Self::Curl => "CURL",
            Self::GithubCli => "GITHUB_CLI",
            Self::Docker => "DOCKER",
        }
    }

    /// Apt package name for capabilities installable in the combined step.
    pub fn apt_package(self) -> Option<&'static str> {
        match self {
            Self::Git => Some("git"),
            Self::Curl => Some("curl"),
            Self::GithubCli | Self::Docker => None,
        }
    }

    /// Dockerfile lines for capabilities needing a dedicated install block.
    pub fn install_block(self) -> Option<&'static [&'static str]> {
        match self {
            Self::GithubCli => Some(GITHUB_CLI_INSTALL),
            Self::Docker => Some(DOCKER_CLI_INSTALL),
            Self::Git | Self::Curl => None,
        }
    }

    /// Whether this capability requires the host Docker socket mounted
    /// into the worker container.
    pub fn needs_docker_socket(self) -> bool {
        matches!(self, Self::Docker)
    }

    /// Complex capabilities in the fixed order their install blocks are
    /// appended to the Dockerfile.
    pub const COMPLEX_ORDER: &'static [Capability] = &[Self::GithubCli, Self::Docker];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GIT" => Ok(Self::Git),
            "CURL" => Ok(Self::Curl),
            "GITHUB_CLI" => Ok(Self::GithubCli),
            "DOCKER" => Ok(Self::Docker),
            _ => Err(UnknownCapability(s.to_string())),
        }
    }
}

/// Error for unrecognized capability strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability: {0}")]
pub struct UnknownCapability(pub String);

/// Normalize a capability set: dedup and sort by canonical name.
pub fn normalize(caps: &[Capability]) -> Vec<Capability> {
    let mut out: Vec<Capability> = caps.to_vec();
    out.sort_by_key(|c| c.as_str());
    out.dedup();
    out
}

#[cfg(test)]
#[path = "capability_tests.rs"]
mod tests;
