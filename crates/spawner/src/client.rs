// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response correlation over the command bus.
//!
//! Publishes a command to the command stream and tail-reads the caller's
//! response stream until the entry with the matching `request_id` shows
//! up or the deadline passes. The tail is anchored *before* publishing so
//! a fast manager cannot slip the response past the reader.

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use wharf_broker::{Broker, BrokerError};
use wharf_core::{Command, Response, StreamNames, WorkerType};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("no response for request {request_id} within {timeout:?}")]
    Timeout { request_id: String, timeout: Duration },
}

pub struct CommandClient {
    broker: Broker,
    names: StreamNames,
    worker_type: WorkerType,
    timeout: Duration,
}

impl CommandClient {
    pub fn new(
        broker: Broker,
        names: StreamNames,
        worker_type: WorkerType,
        timeout: Duration,
    ) -> Self {
        Self { broker, names, worker_type, timeout }
    }

    /// Send one command and wait for its response.
    pub async fn call(&self, command: Command) -> Result<Response, ClientError> {
        self.call_with_timeout(command, self.timeout).await
    }

    pub async fn call_with_timeout(
        &self,
        command: Command,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let request_id = command.request_id().to_string();
        let response_stream = self.names.responses(self.worker_type);

        // Anchor before publishing, so nothing can arrive unseen.
        let mut last_id = self
            .broker
            .last_entry_id(&response_stream)
            .await?
            .unwrap_or_else(|| "0-0".to_string());

        self.broker.publish(&self.names.commands(), &command).await?;
        tracing::debug!(%request_id, stream = %response_stream, "command published");

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ClientError::Timeout { request_id, timeout });
            }
            let block_ms = remaining.as_millis().min(1_000) as usize;

            let entries = self
                .broker
                .read_after(&response_stream, &last_id, 16, block_ms)
                .await?;
            for entry in entries {
                last_id = entry.id.clone();
                match entry.decode::<Response>() {
                    Ok(response) if response.request_id() == request_id => {
                        return Ok(response);
                    }
                    Ok(_) => {} // someone else's reply
                    Err(err) => {
                        tracing::warn!(entry = %entry.id, error = %err, "bad response entry");
                    }
                }
            }
        }
    }
}
