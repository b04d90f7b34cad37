// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Front-end message service.
//!
//! Consumes `agent:incoming` (one entry per front-end message), routes
//! each through [`AgentSpawner::send_message`], and publishes the reply to
//! the principal's `agent:outgoing:<principal_id>` stream. Failures become
//! reply text too — the front-end is never left to infer an error from a
//! timeout.

use crate::spawner::AgentSpawner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wharf_broker::{Broker, StreamEntry};

/// Stream front-ends push message requests onto.
pub const INCOMING_STREAM: &str = "agent:incoming";

/// Consumer group on the incoming stream.
pub const INCOMING_GROUP: &str = "agent_spawner";

/// Per-principal reply stream.
pub fn outgoing_stream(principal_id: &str) -> String {
    format!("agent:outgoing:{principal_id}")
}

/// One message from a front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRequest {
    pub principal_id: String,
    pub message: String,
}

/// Reply published to the principal's outgoing stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into(), timestamp: Utc::now() }
    }
}

pub struct SpawnerService {
    spawner: AgentSpawner,
    broker: Broker,
    consumer_name: String,
    block: Duration,
}

impl SpawnerService {
    pub fn new(spawner: AgentSpawner, broker: Broker, consumer_name: impl Into<String>) -> Self {
        Self {
            spawner,
            broker,
            consumer_name: consumer_name.into(),
            block: Duration::from_millis(5_000),
        }
    }

    /// Consume until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        if let Err(err) = self.broker.ensure_group(INCOMING_STREAM, INCOMING_GROUP).await {
            tracing::error!(error = %err, "failed to ensure incoming consumer group");
            return;
        }
        tracing::info!(stream = INCOMING_STREAM, "spawner service started");

        loop {
            let entries = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.broker.read_group(
                    INCOMING_STREAM,
                    INCOMING_GROUP,
                    &self.consumer_name,
                    10,
                    self.block.as_millis() as usize,
                ) => match result {
                    Ok(entries) => entries,
                    Err(err) => {
                        tracing::error!(error = %err, "incoming read failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                },
            };

            for entry in entries {
                self.handle_entry(&entry).await;
                if let Err(err) =
                    self.broker.ack(INCOMING_STREAM, INCOMING_GROUP, &entry.id).await
                {
                    tracing::error!(entry = %entry.id, error = %err, "failed to ack message");
                }
            }
        }
        tracing::info!("spawner service stopped");
    }

    async fn handle_entry(&self, entry: &StreamEntry) {
        let request: MessageRequest = match entry.decode() {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(entry = %entry.id, error = %err, "unparseable message request");
                return;
            }
        };
        tracing::info!(
            entry = %entry.id,
            principal_id = %request.principal_id,
            "message received"
        );

        let reply = match self.spawner.send_message(&request.principal_id, &request.message).await
        {
            Ok(text) => MessageReply::new(text),
            Err(err) => {
                tracing::error!(
                    principal_id = %request.principal_id,
                    error = %err,
                    "message handling failed"
                );
                MessageReply::new(format!("Error: {err}"))
            }
        };

        let stream = outgoing_stream(&request.principal_id);
        if let Err(err) = self.broker.publish(&stream, &reply).await {
            tracing::error!(stream = %stream, error = %err, "failed to publish reply");
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
