// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle stream watcher.
//!
//! The wrapper announces `started`/`completed`/`failed`/`stopped` on the
//! shared lifecycle stream. The manager consumes those announcements to
//! keep each worker's activity stamp fresh — this is the only activity
//! authority in the system, which is what the idle-pause reaper keys off.
//! `completed`/`failed` also clear the worker's task attribution hash:
//! the wrapper clears it best-effort after each task, but this consumer
//! group is the at-least-once backstop, so a dropped wrapper write cannot
//! leave stale attribution for the crash listener to pick up.

use crate::config::ManagerConfig;
use crate::manager::WorkerManager;
use crate::runtime::ContainerRuntime;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wharf_broker::Broker;
use wharf_core::{streams, Clock, LifecycleEvent, LifecyclePhase, WorkerId};

pub struct LifecycleWatcher<R, C> {
    manager: Arc<WorkerManager<R, C>>,
    broker: Broker,
    cfg: Arc<ManagerConfig>,
}

impl<R: ContainerRuntime, C: Clock> LifecycleWatcher<R, C> {
    pub fn new(manager: Arc<WorkerManager<R, C>>, broker: Broker, cfg: Arc<ManagerConfig>) -> Self {
        Self { manager, broker, cfg }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let stream = self.manager.stream_names().lifecycle();

        if let Err(err) = self.broker.ensure_group(&stream, streams::LIFECYCLE_GROUP).await {
            tracing::error!(error = %err, "failed to ensure lifecycle consumer group");
            return;
        }
        tracing::info!(stream = %stream, "lifecycle watcher started");

        loop {
            let entries = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.broker.read_group(
                    &stream,
                    streams::LIFECYCLE_GROUP,
                    &self.cfg.consumer_name,
                    32,
                    self.cfg.command_block.as_millis() as usize,
                ) => match result {
                    Ok(entries) => entries,
                    Err(err) => {
                        tracing::error!(error = %err, "lifecycle read failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                },
            };

            for entry in entries {
                match entry.decode::<LifecycleEvent>() {
                    Ok(event) => self.apply(&event).await,
                    Err(err) => {
                        tracing::warn!(entry = %entry.id, error = %err, "bad lifecycle entry");
                    }
                }
                if let Err(err) =
                    self.broker.ack(&stream, streams::LIFECYCLE_GROUP, &entry.id).await
                {
                    tracing::error!(entry = %entry.id, error = %err, "failed to ack lifecycle");
                }
            }
        }
        tracing::info!("lifecycle watcher stopped");
    }

    /// Fold one lifecycle event into the manager's view, and clear the
    /// worker's task attribution when the event ends a task.
    pub async fn apply(&self, event: &LifecycleEvent) {
        observe(self.manager.as_ref(), event);
        if ends_task(event.event) {
            self.clear_attribution(&event.worker_id).await;
        }
    }

    async fn clear_attribution(&self, worker_id: &WorkerId) {
        let key = self.manager.stream_names().status_key(worker_id);
        let cleared = vec![
            ("task_id".to_string(), String::new()),
            ("request_id".to_string(), String::new()),
        ];
        if let Err(err) = self.broker.hset(&key, &cleared).await {
            tracing::warn!(%worker_id, error = %err, "failed to clear task attribution");
        }
    }
}

/// Registry-side effect of one lifecycle event: refresh the worker's
/// activity stamp.
pub fn observe<R: ContainerRuntime, C: Clock>(
    manager: &WorkerManager<R, C>,
    event: &LifecycleEvent,
) {
    tracing::debug!(
        worker_id = %event.worker_id,
        event = %event.event,
        "lifecycle event"
    );
    manager.observe_activity(&event.worker_id);
}

/// Whether a lifecycle phase ends a task, requiring the worker's task
/// attribution to be cleared.
pub fn ends_task(phase: LifecyclePhase) -> bool {
    matches!(phase, LifecyclePhase::Completed | LifecyclePhase::Failed)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
