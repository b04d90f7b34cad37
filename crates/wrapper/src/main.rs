// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wharf-wrapper — worker container entrypoint.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wharf_broker::Broker;
use wharf_wrapper::{WorkerWrapper, WrapperConfig, EXIT_BROKER, EXIT_CONFIG, EXIT_OK};

#[tokio::main]
async fn main() {
    // Container healthcheck hook: `wharf-wrapper healthcheck` proves the
    // binary starts without touching the broker.
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        println!("ok");
        std::process::exit(EXIT_OK);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("WHARF_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = match WrapperConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(error = %err, "configuration error");
            std::process::exit(EXIT_CONFIG);
        }
    };
    tracing::info!(worker_id = %cfg.worker_id, agent = %cfg.agent_type, "wrapper starting");

    let broker = match Broker::connect(&cfg.redis_url).await {
        Ok(broker) => broker,
        Err(err) => {
            tracing::error!(error = %err, "broker connection failed");
            std::process::exit(EXIT_BROKER);
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received");
            cancel.cancel();
        });
    }

    let wrapper = WorkerWrapper::new(cfg, broker);
    match wrapper.run(cancel).await {
        Ok(()) => std::process::exit(EXIT_OK),
        Err(err) => {
            tracing::error!(error = %err, "unrecoverable broker error");
            std::process::exit(EXIT_BROKER);
        }
    }
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
