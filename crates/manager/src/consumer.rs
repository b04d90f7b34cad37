// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command stream consumer.
//!
//! Reads the command bus through the `worker_manager` consumer group,
//! dispatches to the manager, and publishes the mirrored response to the
//! caller's response stream. Every entry is ACKed — including poison
//! pills, which yield a structured failure response instead of being
//! redelivered forever.

use crate::config::ManagerConfig;
use crate::manager::{ManagerError, WorkerManager};
use crate::runtime::{ContainerRuntime, RuntimeError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wharf_broker::{Broker, StreamEntry};
use wharf_core::{Clock, Command, Response, COMMAND_GROUP};

pub struct CommandConsumer<R, C> {
    manager: Arc<WorkerManager<R, C>>,
    broker: Broker,
    cfg: Arc<ManagerConfig>,
}

impl<R: ContainerRuntime, C: Clock> CommandConsumer<R, C> {
    pub fn new(manager: Arc<WorkerManager<R, C>>, broker: Broker, cfg: Arc<ManagerConfig>) -> Self {
        Self { manager, broker, cfg }
    }

    /// Consume until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let commands = self.manager.stream_names().commands();

        if let Err(err) = self.broker.ensure_group(&commands, COMMAND_GROUP).await {
            tracing::error!(error = %err, "failed to ensure command consumer group");
            return;
        }
        tracing::info!(
            stream = %commands,
            consumer = %self.cfg.consumer_name,
            "command consumer started"
        );

        loop {
            let entries = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.broker.read_group(
                    &commands,
                    COMMAND_GROUP,
                    &self.cfg.consumer_name,
                    10,
                    self.cfg.command_block.as_millis() as usize,
                ) => match result {
                    Ok(entries) => entries,
                    Err(err) => {
                        tracing::error!(error = %err, "command read failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                },
            };

            for entry in entries {
                let (stream, response) = handle_entry(self.manager.as_ref(), &entry).await;
                if let Err(err) = self.broker.publish(&stream, &response).await {
                    tracing::error!(
                        entry = %entry.id,
                        error = %err,
                        "failed to publish command response"
                    );
                }
                if let Err(err) = self.broker.ack(&commands, COMMAND_GROUP, &entry.id).await {
                    tracing::error!(entry = %entry.id, error = %err, "failed to ack command");
                }
            }
        }
        tracing::info!("command consumer stopped");
    }
}

/// Decode, dispatch, and pick the response stream for one entry.
pub async fn handle_entry<R: ContainerRuntime, C: Clock>(
    manager: &WorkerManager<R, C>,
    entry: &StreamEntry,
) -> (String, Response) {
    match entry.decode::<Command>() {
        Ok(command) => {
            tracing::info!(
                entry = %entry.id,
                request_id = %command.request_id(),
                "processing command"
            );
            let stream = route_for(manager, &command);
            let response = dispatch(manager, command).await;
            (stream, response)
        }
        Err(err) => {
            tracing::warn!(entry = %entry.id, error = %err, "unparseable command entry");
            let response = Response::Error {
                request_id: recover_request_id(entry).unwrap_or_default(),
                success: false,
                error: Some(format!("invalid command: {err}")),
            };
            (manager.stream_names().responses_fallback(), response)
        }
    }
}

/// `create` routes by the config's caller family; other commands by the
/// worker's recorded family, falling back to the default stream when the
/// worker is unknown.
pub fn route_for<R: ContainerRuntime, C: Clock>(
    manager: &WorkerManager<R, C>,
    command: &Command,
) -> String {
    let names = manager.stream_names();
    match command {
        Command::Create { config, .. } => names.responses(config.worker_type),
        other => other
            .worker_id()
            .and_then(|id| manager.worker_type_of(id))
            .map(|wt| names.responses(wt))
            .unwrap_or_else(|| names.responses_fallback()),
    }
}

/// Execute one command against the manager, mirroring the result into the
/// matching response variant.
pub async fn dispatch<R: ContainerRuntime, C: Clock>(
    manager: &WorkerManager<R, C>,
    command: Command,
) -> Response {
    match command {
        Command::Create { request_id, config } => match manager.create(config).await {
            Ok(worker_id) => Response::Create {
                request_id,
                success: true,
                worker_id: Some(worker_id),
                error: None,
            },
            Err(err) => Response::Create {
                request_id,
                success: false,
                worker_id: None,
                error: Some(err.to_string()),
            },
        },
        Command::Delete { request_id, worker_id } => match manager.delete(&worker_id).await {
            Ok(()) => Response::Delete { request_id, success: true, error: None },
            Err(err) => {
                Response::Delete { request_id, success: false, error: Some(err.to_string()) }
            }
        },
        Command::Status { request_id, worker_id } => match manager.status(&worker_id) {
            Ok(status) => Response::Status {
                request_id,
                success: true,
                state: Some(status.state),
                created_at: Some(status.created_at),
                last_activity_at: Some(status.last_activity_at),
                error: None,
            },
            Err(err) => Response::Status {
                request_id,
                success: false,
                state: None,
                created_at: None,
                last_activity_at: None,
                error: Some(err.to_string()),
            },
        },
        Command::SendCommand { request_id, worker_id, shell_command, timeout_seconds } => {
            let timeout = timeout_seconds.map(Duration::from_secs);
            match manager.send_command(&worker_id, &shell_command, timeout).await {
                Ok(output) => Response::SendCommand {
                    request_id,
                    success: true,
                    exit_code: Some(output.exit_code),
                    stdout: Some(output.stdout),
                    stderr: Some(output.stderr),
                    error: None,
                },
                Err(err) => Response::SendCommand {
                    request_id,
                    success: false,
                    exit_code: exec_exit_code(&err),
                    stdout: None,
                    stderr: None,
                    error: Some(err.to_string()),
                },
            }
        }
        Command::SendFile { request_id, worker_id, path, content } => {
            match manager.send_file(&worker_id, &path, &content).await {
                Ok(()) => Response::SendFile { request_id, success: true, error: None },
                Err(err) => Response::SendFile {
                    request_id,
                    success: false,
                    error: Some(err.to_string()),
                },
            }
        }
        Command::GetLogs { request_id, worker_id, tail } => {
            match manager.get_logs(&worker_id, tail).await {
                Ok(logs) => {
                    Response::GetLogs { request_id, success: true, logs: Some(logs), error: None }
                }
                Err(err) => Response::GetLogs {
                    request_id,
                    success: false,
                    logs: None,
                    error: Some(err.to_string()),
                },
            }
        }
    }
}

fn exec_exit_code(err: &ManagerError) -> Option<i32> {
    match err {
        ManagerError::Runtime(RuntimeError::Timeout { .. }) => Some(-1),
        _ => None,
    }
}

/// Best-effort request id recovery from an unparseable entry.
fn recover_request_id(entry: &StreamEntry) -> Option<String> {
    let value = entry.to_json().ok()?;
    value.get("request_id")?.as_str().map(str::to_string)
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
