// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wharf-spawnerd — the front-end message router.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wharf_broker::Broker;
use wharf_core::StreamNames;
use wharf_spawner::{AgentSpawner, SpawnerConfig, SpawnerService};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("WHARF_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let redis_url = std::env::var("WHARF_REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());
    let prefix = std::env::var("WHARF_STREAM_PREFIX")
        .unwrap_or_else(|_| wharf_core::streams::DEFAULT_PREFIX.to_string());
    let consumer_name = std::env::var("WHARF_CONSUMER_NAME").unwrap_or_else(|_| {
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string());
        format!("spawnerd-{host}")
    });
    tracing::info!(redis = %redis_url, %prefix, "wharf-spawnerd starting");

    let broker = match Broker::connect(&redis_url).await {
        Ok(broker) => broker,
        Err(err) => {
            tracing::error!(error = %err, "broker connection failed");
            std::process::exit(1);
        }
    };

    let spawner =
        AgentSpawner::new(broker.clone(), StreamNames::new(prefix), SpawnerConfig::default());
    let service = SpawnerService::new(spawner, broker, consumer_name);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received");
            cancel.cancel();
        });
    }

    service.run(cancel).await;
    tracing::info!("wharf-spawnerd stopped");
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
