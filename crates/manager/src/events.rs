// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime event listener and crash synthesis.
//!
//! Subscribes to the container runtime's die events. A managed worker
//! container exiting non-zero outside wrapper control gets exactly one
//! synthetic `{type:"error", ...}` record appended to its output stream,
//! and the worker is marked failed. Clean exits mark it stopped. Events
//! for workers already in a terminal state (deleted, expired) are
//! ignored — their containers die because we removed them.

use crate::manager::WorkerManager;
use crate::runtime::{ContainerEvent, ContainerRuntime};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wharf_broker::Broker;
use wharf_core::{labels, Clock, CrashRecord, WorkerId, WorkerState};

pub struct RuntimeEventListener<R, C> {
    manager: Arc<WorkerManager<R, C>>,
    broker: Broker,
}

impl<R: ContainerRuntime, C: Clock> RuntimeEventListener<R, C> {
    pub fn new(manager: Arc<WorkerManager<R, C>>, broker: Broker) -> Self {
        Self { manager, broker }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let (tx, mut rx) = mpsc::channel::<ContainerEvent>(64);
        let runtime = self.manager.runtime().clone();
        let feed_cancel = cancel.clone();
        let feed = tokio::spawn(async move {
            if let Err(err) = runtime.watch_events(tx, feed_cancel).await {
                tracing::error!(error = %err, "runtime event feed ended");
            }
        });
        tracing::info!("runtime event listener started");

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            if let Some((worker_id, exit_code)) =
                observe_die_event(self.manager.as_ref(), &event)
            {
                self.synthesize_crash(&worker_id, exit_code, &event).await;
            }
        }

        feed.abort();
        tracing::info!("runtime event listener stopped");
    }

    /// Append the crash record for a worker that died mid-flight.
    async fn synthesize_crash(&self, worker_id: &WorkerId, exit_code: i64, event: &ContainerEvent) {
        let names = self.manager.stream_names();

        // Task attribution: the wrapper keeps the in-flight task id in
        // the worker's status hash; the container label is a fallback for
        // workers created around a single task.
        let task_id = match self.broker.hget(&names.status_key(worker_id), "task_id").await {
            Ok(Some(id)) if !id.is_empty() => Some(id),
            _ => event
                .attribute(labels::TASK_ID)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        };

        let record = CrashRecord::new(task_id, exit_code);
        tracing::warn!(
            %worker_id,
            exit_code,
            task_id = record.task_id.as_deref().unwrap_or(""),
            "worker crashed, synthesizing failure record"
        );
        if let Err(err) = self.broker.publish(&names.output(worker_id), &record).await {
            tracing::error!(%worker_id, error = %err, "failed to publish crash record");
        }
    }
}

/// Fold a runtime event into the worker registry.
///
/// Returns `Some((worker_id, exit_code))` when a crash record must be
/// synthesized: a managed worker's container died non-zero and the worker
/// was not already terminal.
pub fn observe_die_event<R: ContainerRuntime, C: Clock>(
    manager: &WorkerManager<R, C>,
    event: &ContainerEvent,
) -> Option<(WorkerId, i64)> {
    if event.action != "die" {
        return None;
    }
    let worker_id = WorkerId::new(event.attribute(labels::WORKER_ID)?);
    let exit_code = event.exit_code().unwrap_or(-1);

    match manager.on_container_exit(&worker_id, exit_code) {
        Some(WorkerState::Failed) => Some((worker_id, exit_code)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
