// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic enforcement: idle-pause, TTL expiry, image GC.
//!
//! Each reaper is an independent ticker over the manager's decision
//! methods (which are tested directly with a fake clock); the loops here
//! are just scheduling and logging.

use crate::manager::WorkerManager;
use crate::runtime::ContainerRuntime;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wharf_core::Clock;

/// Pause workers idle longer than `threshold`, once per `interval`.
pub async fn run_idle_pause<R: ContainerRuntime, C: Clock>(
    manager: Arc<WorkerManager<R, C>>,
    interval: Duration,
    threshold: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(?interval, ?threshold, "idle-pause reaper started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let paused = manager.pause_idle(threshold).await;
        if !paused.is_empty() {
            tracing::info!(count = paused.len(), "paused idle workers");
        }
    }
    tracing::info!("idle-pause reaper stopped");
}

/// Expire workers past their TTL, once per `interval`.
pub async fn run_ttl_reaper<R: ContainerRuntime, C: Clock>(
    manager: Arc<WorkerManager<R, C>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(?interval, "ttl reaper started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let expired = manager.reap_expired().await;
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired workers destroyed");
        }
    }
    tracing::info!("ttl reaper stopped");
}

/// Remove cached images unused for longer than `retention`, once per
/// `interval`.
pub async fn run_image_gc<R: ContainerRuntime, C: Clock>(
    manager: Arc<WorkerManager<R, C>>,
    interval: Duration,
    retention: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(?interval, ?retention, "image GC started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        match manager.gc_images(retention).await {
            Ok(removed) if !removed.is_empty() => {
                tracing::info!(count = removed.len(), "garbage-collected images");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "image GC pass failed"),
        }
    }
    tracing::info!("image GC stopped");
}
