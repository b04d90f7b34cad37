// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent runner registry.
//!
//! One small value per agent family: build the argv for a prompt, and
//! know how to fish a session id out of the agent's output. New families
//! register here; no family-specific logic leaks into the consume loop.

use serde_json::Value;
use wharf_core::AgentKind;

pub trait AgentRunner: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Argv to run one task. `session_id` is included only when the
    /// family supports resumption.
    fn build_argv(&self, prompt: &str, session_id: Option<&str>) -> Vec<String>;

    /// Pull the agent-allocated session id out of stdout, for families
    /// that manage their own ids.
    fn extract_session_id(&self, _stdout: &str) -> Option<String> {
        None
    }
}

/// Claude Code: JSON output, skip-permissions, resumes via `--resume`.
pub struct ClaudeRunner;

impl AgentRunner for ClaudeRunner {
    fn kind(&self) -> AgentKind {
        AgentKind::Claude
    }

    fn build_argv(&self, prompt: &str, session_id: Option<&str>) -> Vec<String> {
        let mut argv = vec![
            "claude".to_string(),
            "--dangerously-skip-permissions".to_string(),
            "-p".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if let Some(session_id) = session_id {
            argv.push("--resume".to_string());
            argv.push(session_id.to_string());
        }
        argv
    }

    /// `claude --output-format json` emits `{"session_id": "...", ...}`,
    /// either as the whole stdout or as one line among streaming output.
    fn extract_session_id(&self, stdout: &str) -> Option<String> {
        if let Some(id) = session_id_from_json(stdout) {
            return Some(id);
        }
        stdout.lines().find_map(session_id_from_json)
    }
}

fn session_id_from_json(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    value.get("session_id")?.as_str().map(str::to_string)
}

/// Factory Droid: `droid exec -o json <prompt>`. No session support.
pub struct FactoryRunner;

impl AgentRunner for FactoryRunner {
    fn kind(&self) -> AgentKind {
        AgentKind::Factory
    }

    fn build_argv(&self, prompt: &str, _session_id: Option<&str>) -> Vec<String> {
        vec![
            "droid".to_string(),
            "exec".to_string(),
            "-o".to_string(),
            "json".to_string(),
            prompt.to_string(),
        ]
    }
}

static CLAUDE: ClaudeRunner = ClaudeRunner;
static FACTORY: FactoryRunner = FactoryRunner;

/// The runner for an agent family.
pub fn runner_for(kind: AgentKind) -> &'static dyn AgentRunner {
    match kind {
        AgentKind::Claude => &CLAUDE,
        AgentKind::Factory => &FACTORY,
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
