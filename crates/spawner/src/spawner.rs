// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Principal→worker mapping and message routing.

use crate::client::{ClientError, CommandClient};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;
use wharf_broker::{Broker, BrokerError};
use wharf_core::{
    AgentKind, AuthMode, Capability, Command, Response, StreamNames, WorkerConfig, WorkerId,
    WorkerType,
};

#[derive(Debug, Error)]
pub enum SpawnerError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("worker command failed: {0}")]
    CommandFailed(String),

    #[error("agent execution failed: {0}")]
    AgentFailed(String),
}

#[derive(Debug, Clone)]
pub struct SpawnerConfig {
    /// Caller family; also the response stream this spawner listens on.
    pub worker_type: WorkerType,
    pub agent_type: AgentKind,
    pub capabilities: Vec<Capability>,
    /// TTL (hours) for workers this spawner creates.
    pub ttl_hours: u32,
    /// Mount the host session directory into created workers.
    pub mount_session_volume: bool,
    /// TTL on the principal→worker mapping, independent of worker TTL.
    pub mapping_ttl: Duration,
    /// TTL on stored session ids.
    pub session_ttl: Duration,
    /// End-to-end deadline for one message turn.
    pub message_timeout: Duration,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            worker_type: WorkerType::Po,
            agent_type: AgentKind::Claude,
            capabilities: vec![Capability::Git],
            ttl_hours: 24,
            mount_session_volume: true,
            mapping_ttl: Duration::from_secs(7 * 24 * 3_600),
            session_ttl: Duration::from_secs(7 * 24 * 3_600),
            message_timeout: Duration::from_secs(120),
        }
    }
}

pub struct AgentSpawner {
    broker: Broker,
    client: CommandClient,
    names: StreamNames,
    cfg: SpawnerConfig,
}

impl AgentSpawner {
    pub fn new(broker: Broker, names: StreamNames, cfg: SpawnerConfig) -> Self {
        let client = CommandClient::new(
            broker.clone(),
            names.clone(),
            cfg.worker_type,
            cfg.message_timeout,
        );
        Self { broker, client, names, cfg }
    }

    /// Resolve the principal's worker, creating one when the mapping is
    /// absent or the referenced worker is no longer live.
    pub async fn get_or_create_agent(&self, principal_id: &str) -> Result<WorkerId, SpawnerError> {
        let map_key = self.names.principal_map_key(principal_id);

        if let Some(existing) = self.broker.get(&map_key).await? {
            let worker_id = WorkerId::new(existing);
            if self.worker_is_live(&worker_id).await? {
                self.broker.expire(&map_key, self.cfg.mapping_ttl.as_secs() as i64).await?;
                return Ok(worker_id);
            }
            tracing::info!(%worker_id, principal_id, "mapped worker gone, creating a new one");
        }

        let worker_id = self.create_worker(principal_id).await?;
        self.broker
            .set_with_ttl(&map_key, worker_id.as_str(), self.cfg.mapping_ttl.as_secs())
            .await?;
        Ok(worker_id)
    }

    /// Run one conversational turn against the principal's agent and
    /// return the reply text.
    pub async fn send_message(
        &self,
        principal_id: &str,
        text: &str,
    ) -> Result<String, SpawnerError> {
        let worker_id = self.get_or_create_agent(principal_id).await?;

        // Stored session id, refreshed on access. Its absence just means
        // a first turn.
        let session_key = self.names.session_key(&worker_id);
        let session_id = self.broker.get(&session_key).await?;
        if session_id.is_some() {
            self.broker.expire(&session_key, self.cfg.session_ttl.as_secs() as i64).await?;
        }

        let shell_command = agent_shell_command(self.cfg.agent_type, text, session_id.as_deref());
        let command = Command::SendCommand {
            request_id: Uuid::new_v4().to_string(),
            worker_id: worker_id.clone(),
            shell_command,
            timeout_seconds: Some(self.cfg.message_timeout.as_secs()),
        };

        let response = self.client.call(command).await?;
        let (exit_code, stdout, stderr) = match response {
            Response::SendCommand { success: true, exit_code, stdout, stderr, .. } => {
                (exit_code.unwrap_or(-1), stdout.unwrap_or_default(), stderr.unwrap_or_default())
            }
            other => {
                return Err(SpawnerError::CommandFailed(
                    other.error().unwrap_or("unknown error").to_string(),
                ));
            }
        };
        if exit_code != 0 {
            return Err(SpawnerError::AgentFailed(format!(
                "agent exited with code {exit_code}: {}",
                stderr.trim()
            )));
        }

        let turn = parse_agent_stdout(&stdout);
        if let Some(new_session) = &turn.session_id {
            self.broker
                .set_with_ttl(&session_key, new_session, self.cfg.session_ttl.as_secs())
                .await?;
        }
        Ok(turn.reply)
    }

    async fn worker_is_live(&self, worker_id: &WorkerId) -> Result<bool, SpawnerError> {
        let command = Command::Status {
            request_id: Uuid::new_v4().to_string(),
            worker_id: worker_id.clone(),
        };
        match self.client.call(command).await {
            Ok(Response::Status { success: true, state: Some(state), .. }) => Ok(state.is_live()),
            Ok(_) => Ok(false),
            // A silent manager is indistinguishable from a dead worker;
            // recreating is the safe side.
            Err(ClientError::Timeout { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn create_worker(&self, principal_id: &str) -> Result<WorkerId, SpawnerError> {
        let mut config =
            WorkerConfig::new(worker_name_for(principal_id), self.cfg.agent_type);
        config.worker_type = self.cfg.worker_type;
        config.capabilities = self.cfg.capabilities.clone();
        config.ttl_hours = self.cfg.ttl_hours;
        config.mount_session_volume = self.cfg.mount_session_volume;
        if self.cfg.mount_session_volume {
            config.auth_mode = AuthMode::HostSession;
        }

        let command =
            Command::Create { request_id: Uuid::new_v4().to_string(), config };
        match self.client.call(command).await? {
            Response::Create { success: true, worker_id: Some(worker_id), .. } => {
                tracing::info!(%worker_id, principal_id, "worker created for principal");
                Ok(worker_id)
            }
            other => Err(SpawnerError::CommandFailed(
                other.error().unwrap_or("create returned no worker").to_string(),
            )),
        }
    }
}

/// One parsed agent turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTurn {
    pub reply: String,
    pub session_id: Option<String>,
}

/// Parse the agent CLI's stdout: a JSON envelope yields its `result` text
/// and `session_id`; anything else is returned verbatim.
pub fn parse_agent_stdout(stdout: &str) -> AgentTurn {
    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(Value::Object(envelope)) => {
            let reply = match envelope.get("result") {
                Some(Value::String(text)) => text.clone(),
                _ => stdout.trim().to_string(),
            };
            let session_id = envelope
                .get("session_id")
                .and_then(Value::as_str)
                .map(str::to_string);
            AgentTurn { reply, session_id }
        }
        _ => AgentTurn { reply: stdout.trim().to_string(), session_id: None },
    }
}

/// The shell command that runs one agent turn inside the container.
pub fn agent_shell_command(agent: AgentKind, text: &str, session_id: Option<&str>) -> String {
    let mut parts: Vec<String> = match agent {
        AgentKind::Claude => vec![
            "claude".into(),
            "--dangerously-skip-permissions".into(),
            "-p".into(),
            shell_quote(text),
            "--output-format".into(),
            "json".into(),
        ],
        AgentKind::Factory => {
            vec!["droid".into(), "exec".into(), "-o".into(), "json".into(), shell_quote(text)]
        }
    };
    if agent.supports_resume() {
        if let Some(session_id) = session_id {
            parts.push("--resume".into());
            parts.push(shell_quote(session_id));
        }
    }
    parts.join(" ")
}

/// Derive a valid worker name (`[a-z0-9-]+`, bounded length) from an
/// arbitrary principal id.
pub fn worker_name_for(principal_id: &str) -> String {
    let mut name: String = principal_id
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect();
    name.truncate(40);
    let trimmed = name.trim_matches('-');
    if trimmed.is_empty() {
        "agent-unnamed".to_string()
    } else {
        format!("agent-{trimmed}")
    }
}

/// Single-quote `s` for POSIX sh.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "spawner_tests.rs"]
mod tests;
