// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager configuration, read once at startup from `WHARF_*` env vars.
//! Immutable afterwards; passed down explicitly.

use std::path::PathBuf;
use std::time::Duration;
use wharf_core::{AgentKind, StreamNames};

/// Default idle threshold before a running worker is paused.
const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 30 * 60;

/// Default retention for unused cached images.
const DEFAULT_IMAGE_RETENTION_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Broker URL (`redis://...`).
    pub redis_url: String,
    /// Prefix for all stream and key names.
    pub stream_prefix: String,
    /// Prefix for container names (`<prefix>-<worker_id>`).
    pub container_prefix: String,
    /// Repository part of cached image tags.
    pub image_prefix: String,
    /// Base image for Claude workers.
    pub claude_base_image: String,
    /// Base image for Factory workers.
    pub factory_base_image: String,
    /// Docker network to attach workers to; host networking when unset.
    pub network: Option<String>,
    /// Consumer name on the command stream (unique per manager instance).
    pub consumer_name: String,
    /// Block timeout for command stream reads.
    pub command_block: Duration,
    /// Default timeout for `send_command` execs.
    pub exec_timeout: Duration,
    /// Idle threshold before the pause reaper acts.
    pub idle_threshold: Duration,
    /// Tick interval for the idle-pause and TTL reapers.
    pub reaper_interval: Duration,
    /// Tick interval for image GC.
    pub image_gc_interval: Duration,
    /// Retention for unused cached images.
    pub image_retention: Duration,
    /// Host path of the session directory mounted for `host_session` auth.
    pub host_claude_dir: Option<PathBuf>,
    /// API key injected for `api_key` auth workers.
    pub api_key: Option<String>,
}

impl ManagerConfig {
    /// Read configuration from the environment. Only the broker URL has a
    /// non-constant default; everything else falls back to fixed values.
    pub fn from_env() -> Self {
        Self {
            redis_url: env_or("WHARF_REDIS_URL", "redis://127.0.0.1:6379/0"),
            stream_prefix: env_or("WHARF_STREAM_PREFIX", wharf_core::streams::DEFAULT_PREFIX),
            container_prefix: env_or("WHARF_CONTAINER_PREFIX", "wharf"),
            image_prefix: env_or("WHARF_IMAGE_PREFIX", "wharf"),
            claude_base_image: env_or("WHARF_CLAUDE_BASE_IMAGE", "wharf-claude-base:latest"),
            factory_base_image: env_or("WHARF_FACTORY_BASE_IMAGE", "wharf-factory-base:latest"),
            network: std::env::var("WHARF_NETWORK").ok().filter(|s| !s.is_empty()),
            consumer_name: std::env::var("WHARF_CONSUMER_NAME").unwrap_or_else(|_| {
                let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string());
                format!("wharfd-{host}")
            }),
            command_block: env_duration_ms("WHARF_COMMAND_BLOCK_MS", 5_000),
            exec_timeout: env_duration_secs("WHARF_EXEC_TIMEOUT_SECONDS", 120),
            idle_threshold: env_duration_secs(
                "WHARF_IDLE_THRESHOLD_SECONDS",
                DEFAULT_IDLE_THRESHOLD_SECS,
            ),
            reaper_interval: env_duration_secs("WHARF_REAPER_INTERVAL_SECONDS", 60),
            image_gc_interval: env_duration_secs("WHARF_IMAGE_GC_INTERVAL_SECONDS", 3_600),
            image_retention: env_duration_secs(
                "WHARF_IMAGE_RETENTION_SECONDS",
                DEFAULT_IMAGE_RETENTION_SECS,
            ),
            host_claude_dir: std::env::var("WHARF_HOST_CLAUDE_DIR")
                .ok()
                .map(PathBuf::from)
                .or_else(|| dirs::home_dir().map(|h| h.join(".claude"))),
            api_key: std::env::var("ANTHROPIC_API_KEY").ok().filter(|s| !s.is_empty()),
        }
    }

    pub fn stream_names(&self) -> StreamNames {
        StreamNames::new(self.stream_prefix.clone())
    }

    /// Base image for an agent family.
    pub fn base_image(&self, kind: AgentKind) -> &str {
        match kind {
            AgentKind::Claude => &self.claude_base_image,
            AgentKind::Factory => &self.factory_base_image,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default_secs))
}

fn env_duration_ms(key: &str, default_ms: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(default_ms))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
