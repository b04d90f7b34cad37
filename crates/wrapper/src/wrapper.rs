// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The consume loop.
//!
//! One message at a time: persist crash attribution, announce `started`,
//! resolve the session, run the agent subprocess under a timeout,
//! evaluate its output, publish the result (or the raw fallback), announce
//! `completed`/`failed`, ACK. The input message is ACKed on every path —
//! failure reporting happens on the lifecycle stream, not through
//! redelivery.

use crate::config::WrapperConfig;
use crate::parser;
use crate::runner::{runner_for, AgentRunner};
use crate::session::SessionStore;
use serde_json::Value;
use std::process::Stdio;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use wharf_broker::{Broker, BrokerError, RetryBudget, StreamEntry};
use wharf_core::{LifecycleEvent, RawOutput, StreamNames, TaskMessage};

/// How much stderr tail survives into a failure report.
const STDERR_TAIL_BYTES: usize = 2_000;

#[derive(Debug, Error)]
pub enum WrapperError {
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// What one agent run means for the streams.
#[derive(Debug, PartialEq)]
pub enum TaskOutcome {
    /// Structured result: publish it, lifecycle `completed`.
    Completed(Value),
    /// No result block: publish the raw fallback, lifecycle `completed`.
    CompletedRaw(RawOutput),
    /// Agent or parse failure: publish nothing, lifecycle `failed`.
    Failed { error: String, exit_code: Option<i32> },
}

/// Classify a finished agent run. Pure; the consume loop acts on it.
pub fn evaluate_run(exit_code: i32, stdout: &str, stderr: &str) -> TaskOutcome {
    if exit_code != 0 {
        return TaskOutcome::Failed {
            error: format!(
                "agent exited with code {exit_code}: {}",
                tail(stderr, STDERR_TAIL_BYTES)
            ),
            exit_code: Some(exit_code),
        };
    }
    match parser::extract_result(stdout) {
        Ok(Some(result)) => TaskOutcome::Completed(result),
        Ok(None) => TaskOutcome::CompletedRaw(RawOutput::new(stdout)),
        Err(err) => TaskOutcome::Failed { error: err.to_string(), exit_code: Some(exit_code) },
    }
}

/// Last `max_bytes` of a string, on a char boundary.
fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

pub struct WorkerWrapper {
    cfg: WrapperConfig,
    broker: Broker,
    names: StreamNames,
    session: SessionStore,
    runner: &'static dyn AgentRunner,
}

impl WorkerWrapper {
    pub fn new(cfg: WrapperConfig, broker: Broker) -> Self {
        let names = cfg.stream_names();
        let session = SessionStore::new(
            broker.clone(),
            names.session_key(&cfg.worker_id),
            cfg.session_ttl,
        );
        let runner = runner_for(cfg.agent_type);
        Self { cfg, broker, names, session, runner }
    }

    /// Consume the input stream until cancelled. Returns an error only
    /// when the broker stays unreachable past the retry budget.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), WrapperError> {
        self.broker
            .ensure_group(&self.cfg.input_stream, &self.cfg.consumer_group)
            .await?;
        tracing::info!(
            worker_id = %self.cfg.worker_id,
            stream = %self.cfg.input_stream,
            agent = %self.cfg.agent_type,
            "wrapper consuming"
        );

        let mut budget = RetryBudget::default();
        loop {
            // One in-flight message: ordering per worker is the broker's
            // consumer-group guarantee plus this count=1 read.
            let entries = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.broker.read_group(
                    &self.cfg.input_stream,
                    &self.cfg.consumer_group,
                    &self.cfg.consumer_name,
                    1,
                    self.cfg.poll_interval.as_millis() as usize,
                ) => match result {
                    Ok(entries) => {
                        budget = RetryBudget::default();
                        entries
                    }
                    Err(err) => match budget.next_delay() {
                        Some(delay) => {
                            tracing::warn!(error = %err, "input read failed, backing off");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        None => return Err(WrapperError::Broker(err)),
                    },
                },
            };

            for entry in entries {
                self.process_message(&entry).await;
                if let Err(err) = self
                    .broker
                    .ack(&self.cfg.input_stream, &self.cfg.consumer_group, &entry.id)
                    .await
                {
                    tracing::error!(entry = %entry.id, error = %err, "failed to ack task");
                }
            }
        }

        self.emit(LifecycleEvent::stopped(self.cfg.worker_id.clone())).await;
        tracing::info!(worker_id = %self.cfg.worker_id, "wrapper shutting down");
        Ok(())
    }

    /// Handle one task message. Never fails the loop: every problem is
    /// reported on the lifecycle stream and the message is ACKed by the
    /// caller.
    async fn process_message(&self, entry: &StreamEntry) {
        let task: TaskMessage = match entry.decode() {
            Ok(task) => task,
            Err(err) => {
                tracing::warn!(entry = %entry.id, error = %err, "unparseable task message");
                return;
            }
        };
        tracing::info!(
            entry = %entry.id,
            task_id = task.task_id.as_deref().unwrap_or(""),
            "processing task"
        );

        self.record_attribution(&task).await;
        self.emit(LifecycleEvent::started(self.cfg.worker_id.clone())).await;

        let outcome = self.execute(&task).await;

        match outcome {
            TaskOutcome::Completed(result) => {
                self.publish_result(&result).await;
                self.emit(LifecycleEvent::completed(
                    self.cfg.worker_id.clone(),
                    Some(result),
                ))
                .await;
            }
            TaskOutcome::CompletedRaw(raw) => {
                tracing::warn!(entry = %entry.id, "no result block in agent output");
                let value = serde_json::to_value(&raw).unwrap_or(Value::Null);
                self.publish_result(&value).await;
                self.emit(LifecycleEvent::completed(self.cfg.worker_id.clone(), Some(value)))
                    .await;
            }
            TaskOutcome::Failed { error, exit_code } => {
                tracing::error!(entry = %entry.id, %error, "task failed");
                self.emit(LifecycleEvent::failed(
                    self.cfg.worker_id.clone(),
                    error,
                    exit_code,
                ))
                .await;
            }
        }

        self.clear_attribution().await;
    }

    /// Run the agent subprocess for one task and classify the outcome.
    async fn execute(&self, task: &TaskMessage) -> TaskOutcome {
        if task.content.is_empty() {
            return TaskOutcome::Failed {
                error: "task message has no content".to_string(),
                exit_code: None,
            };
        }

        // Self-managed session families run their first turn without an
        // id; everyone else gets one minted here.
        let create_new = !self.cfg.agent_type.manages_own_session();
        let session_id = match self.session.get_or_create(create_new).await {
            Ok(session_id) => session_id,
            Err(err) => {
                return TaskOutcome::Failed {
                    error: format!("session lookup failed: {err}"),
                    exit_code: None,
                };
            }
        };

        let resume = if self.cfg.agent_type.supports_resume() {
            session_id.as_deref()
        } else {
            None
        };
        let argv = self.runner.build_argv(&task.content, resume);
        tracing::debug!(argv = ?argv, "spawning agent");

        let output = match self.spawn_agent(&argv).await {
            Ok(output) => output,
            Err(err) => return err,
        };

        // First turn of a self-managing family: capture the id the agent
        // allocated so the next task resumes the conversation.
        if self.cfg.agent_type.manages_own_session() && session_id.is_none() && output.exit_code == 0
        {
            if let Some(captured) = self.runner.extract_session_id(&output.stdout) {
                tracing::info!(session_id = %captured, "captured agent session id");
                if let Err(err) = self.session.save(&captured).await {
                    tracing::warn!(error = %err, "failed to persist session id");
                }
            }
        }

        evaluate_run(output.exit_code, &output.stdout, &output.stderr)
    }

    async fn spawn_agent(&self, argv: &[String]) -> Result<AgentOutput, TaskOutcome> {
        let Some((program, args)) = argv.split_first() else {
            return Err(TaskOutcome::Failed {
                error: "runner produced an empty argv".to_string(),
                exit_code: None,
            });
        };

        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(err) => {
                return Err(TaskOutcome::Failed {
                    error: format!("failed to spawn agent: {err}"),
                    exit_code: None,
                });
            }
        };

        let waited =
            tokio::time::timeout(self.cfg.subprocess_timeout, child.wait_with_output()).await;
        match waited {
            Ok(Ok(output)) => Ok(AgentOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            Ok(Err(err)) => Err(TaskOutcome::Failed {
                error: format!("agent wait failed: {err}"),
                exit_code: None,
            }),
            Err(_) => Err(TaskOutcome::Failed {
                error: format!(
                    "agent timed out after {}s",
                    self.cfg.subprocess_timeout.as_secs()
                ),
                exit_code: None,
            }),
        }
    }

    /// Persist task/request ids so the crash listener can attribute a
    /// container death to this task.
    async fn record_attribution(&self, task: &TaskMessage) {
        let mut fields = Vec::new();
        if let Some(task_id) = &task.task_id {
            fields.push(("task_id".to_string(), task_id.clone()));
        }
        if let Some(request_id) = &task.request_id {
            fields.push(("request_id".to_string(), request_id.clone()));
        }
        if fields.is_empty() {
            return;
        }
        let key = self.names.status_key(&self.cfg.worker_id);
        if let Err(err) = self.broker.hset(&key, &fields).await {
            tracing::warn!(error = %err, "failed to record task attribution");
        }
    }

    async fn clear_attribution(&self) {
        let key = self.names.status_key(&self.cfg.worker_id);
        let cleared = vec![
            ("task_id".to_string(), String::new()),
            ("request_id".to_string(), String::new()),
        ];
        if let Err(err) = self.broker.hset(&key, &cleared).await {
            tracing::warn!(error = %err, "failed to clear task attribution");
        }
    }

    async fn publish_result(&self, result: &Value) {
        if let Err(err) = self.broker.publish(&self.cfg.output_stream, result).await {
            tracing::error!(error = %err, "failed to publish result");
        }
    }

    async fn emit(&self, event: LifecycleEvent) {
        if let Err(err) = self.broker.publish(&self.names.lifecycle(), &event).await {
            tracing::error!(event = %event.event, error = %err, "failed to publish lifecycle");
        }
    }
}

struct AgentOutput {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

#[cfg(test)]
#[path = "wrapper_tests.rs"]
mod tests;
