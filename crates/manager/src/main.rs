// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wharfd — the worker manager daemon.
//!
//! Wires the command consumer, lifecycle watcher, runtime event listener,
//! and the three reapers around one `WorkerManager`, with an orphan sweep
//! on both edges of the process lifetime.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wharf_broker::Broker;
use wharf_manager::image::BrokerImageLru;
use wharf_manager::{
    reaper, sweep, CommandConsumer, DockerCli, ImageStore, ManagerConfig, RuntimeEventListener,
    WorkerManager,
};
use wharf_core::SystemClock;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("WHARF_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Arc::new(ManagerConfig::from_env());
    tracing::info!(
        redis = %cfg.redis_url,
        prefix = %cfg.stream_prefix,
        consumer = %cfg.consumer_name,
        "wharfd starting"
    );

    let broker = match Broker::connect(&cfg.redis_url).await {
        Ok(broker) => broker,
        Err(err) => {
            tracing::error!(error = %err, "broker connection failed");
            std::process::exit(1);
        }
    };

    let runtime = Arc::new(DockerCli::new());
    let clock = SystemClock;
    let names = cfg.stream_names();
    let lru = Arc::new(BrokerImageLru::new(broker.clone(), names));
    let images = ImageStore::new(runtime.clone(), lru, clock, cfg.image_prefix.clone());
    let manager = Arc::new(WorkerManager::new(runtime.clone(), images, cfg.clone(), clock));

    // Cold-start sweep before consuming anything.
    match sweep::orphan_sweep(runtime.as_ref(), &cfg.container_prefix).await {
        Ok(removed) if !removed.is_empty() => {
            tracing::info!(count = removed.len(), "cold-start orphan sweep done");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "cold-start orphan sweep failed"),
    }

    let cancel = CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();

    {
        let consumer = CommandConsumer::new(manager.clone(), broker.clone(), cfg.clone());
        let cancel = cancel.clone();
        tasks.spawn(async move { consumer.run(cancel).await });
    }
    {
        let watcher = wharf_manager::lifecycle::LifecycleWatcher::new(
            manager.clone(),
            broker.clone(),
            cfg.clone(),
        );
        let cancel = cancel.clone();
        tasks.spawn(async move { watcher.run(cancel).await });
    }
    {
        let listener = RuntimeEventListener::new(manager.clone(), broker.clone());
        let cancel = cancel.clone();
        tasks.spawn(async move { listener.run(cancel).await });
    }
    tasks.spawn(reaper::run_idle_pause(
        manager.clone(),
        cfg.reaper_interval,
        cfg.idle_threshold,
        cancel.clone(),
    ));
    tasks.spawn(reaper::run_ttl_reaper(manager.clone(), cfg.reaper_interval, cancel.clone()));
    tasks.spawn(reaper::run_image_gc(
        manager.clone(),
        cfg.image_gc_interval,
        cfg.image_retention,
        cancel.clone(),
    ));

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received");
    cancel.cancel();

    // Brief drain for in-flight commands, then tear everything down.
    let drain = tokio::time::timeout(Duration::from_secs(5), async {
        while tasks.join_next().await.is_some() {}
    });
    if drain.await.is_err() {
        tracing::warn!("drain timed out, aborting remaining tasks");
        tasks.abort_all();
    }

    match sweep::orphan_sweep(runtime.as_ref(), &cfg.container_prefix).await {
        Ok(removed) => {
            tracing::info!(count = removed.len(), "shutdown sweep removed containers")
        }
        Err(err) => tracing::warn!(error = %err, "shutdown sweep failed"),
    }
    tracing::info!("wharfd stopped");
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(term) => term,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
