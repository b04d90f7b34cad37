// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic capability→image derivation.
//!
//! A worker image is keyed by `(agent_kind, capability set)`. The tag is
//! `<prefix>:<hash12>` where `hash12` is the first 12 hex chars of the
//! SHA-256 of the canonical string `"<kind>:<CAPS>"` — capabilities
//! upper-cased, deduplicated, sorted, and comma-joined. Reordering or
//! re-casing the capability list never changes the tag; changing the
//! agent kind always does.

use crate::agent::AgentKind;
use crate::capability::{self, Capability};
use crate::labels;
use sha2::{Digest, Sha256};

/// Length of the truncated image hash.
pub const HASH_LEN: usize = 12;

/// Canonical string the image hash is computed over.
pub fn canonical_key(agent: AgentKind, caps: &[Capability]) -> String {
    let normalized = capability::normalize(caps);
    let joined =
        normalized.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(",");
    format!("{}:{}", agent.as_str(), joined)
}

/// First 12 hex chars of SHA-256 over the canonical key.
pub fn capability_hash(agent: AgentKind, caps: &[Capability]) -> String {
    let digest = Sha256::digest(canonical_key(agent, caps).as_bytes());
    let mut out = String::with_capacity(HASH_LEN);
    for byte in digest.iter().take(HASH_LEN / 2) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Full image tag: `<prefix>:<hash12>`.
pub fn image_tag(prefix: &str, agent: AgentKind, caps: &[Capability]) -> String {
    format!("{}:{}", prefix, capability_hash(agent, caps))
}

/// Generate the Dockerfile for a capability set.
///
/// Layout is fixed so identical sets produce byte-identical files:
/// base image, one combined apt step for the simple capabilities
/// (alphabetical), then the complex install blocks in declaration order,
/// then the agent-kind label.
pub fn dockerfile(base_image: &str, agent: AgentKind, caps: &[Capability]) -> String {
    let normalized = capability::normalize(caps);
    let mut lines = vec![format!("FROM {base_image}")];

    let mut apt_packages: Vec<&str> =
        normalized.iter().filter_map(|c| c.apt_package()).collect();
    apt_packages.sort_unstable();

    if !apt_packages.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "RUN apt-get update && apt-get install -y --no-install-recommends {} && rm -rf /var/lib/apt/lists/*",
            apt_packages.join(" ")
        ));
    }

    for cap in Capability::COMPLEX_ORDER {
        if normalized.contains(cap) {
            if let Some(block) = cap.install_block() {
                lines.push(String::new());
                lines.extend(block.iter().map(|l| l.to_string()));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!("LABEL {}={}", labels::AGENT_KIND, agent.as_str()));

    lines.join("\n")
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
