// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Image build-and-cache.
//!
//! Worker images are keyed by `(agent_kind, capability set)` via the
//! deterministic tag from `wharf_core::image`. On cache miss the
//! Dockerfile is generated and built; every hit or build refreshes the
//! tag's last-used timestamp in the broker so the GC reaper can expire
//! cold images. Concurrent builds for the same tag are serialized with an
//! in-process lock table; concurrent builds across tags proceed freely.

use crate::runtime::{ContainerRuntime, RuntimeError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use wharf_broker::{Broker, BrokerError};
use wharf_core::{image, AgentKind, Capability, Clock, StreamNames};

/// Last-used bookkeeping for cached images.
#[async_trait]
pub trait ImageLru: Send + Sync + 'static {
    async fn touch(&self, tag: &str, unix_seconds: u64) -> Result<(), BrokerError>;

    /// All `(tag, last_used_unix_seconds)` entries.
    async fn entries(&self) -> Result<Vec<(String, u64)>, BrokerError>;

    async fn forget(&self, tag: &str) -> Result<(), BrokerError>;
}

/// Broker-backed LRU under `worker:image:last_used:<tag>`.
#[derive(Clone)]
pub struct BrokerImageLru {
    broker: Broker,
    names: StreamNames,
}

impl BrokerImageLru {
    pub fn new(broker: Broker, names: StreamNames) -> Self {
        Self { broker, names }
    }
}

#[async_trait]
impl ImageLru for BrokerImageLru {
    async fn touch(&self, tag: &str, unix_seconds: u64) -> Result<(), BrokerError> {
        // Plain SET: last-writer-wins is exactly the semantics wanted for
        // a last-used stamp.
        self.broker.set(&self.names.image_lru_key(tag), &unix_seconds.to_string()).await
    }

    async fn entries(&self) -> Result<Vec<(String, u64)>, BrokerError> {
        let keys = self.broker.scan_keys(&self.names.image_lru_pattern()).await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(tag) = self.names.image_tag_from_lru_key(&key) else {
                continue;
            };
            if let Some(raw) = self.broker.get(&key).await? {
                if let Ok(stamp) = raw.parse::<u64>() {
                    out.push((tag.to_string(), stamp));
                }
            }
        }
        Ok(out)
    }

    async fn forget(&self, tag: &str) -> Result<(), BrokerError> {
        self.broker.del(&self.names.image_lru_key(tag)).await
    }
}

/// Build-and-cache front for worker images.
pub struct ImageStore<R, C> {
    runtime: Arc<R>,
    lru: Arc<dyn ImageLru>,
    clock: C,
    image_prefix: String,
    build_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<R: ContainerRuntime, C: Clock> ImageStore<R, C> {
    pub fn new(
        runtime: Arc<R>,
        lru: Arc<dyn ImageLru>,
        clock: C,
        image_prefix: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            lru,
            clock,
            image_prefix: image_prefix.into(),
            build_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn image_prefix(&self) -> &str {
        &self.image_prefix
    }

    /// Tag for a capability set without touching the runtime.
    pub fn tag_for(&self, agent: AgentKind, caps: &[Capability]) -> String {
        image::image_tag(&self.image_prefix, agent, caps)
    }

    fn build_lock(&self, tag: &str) -> Arc<AsyncMutex<()>> {
        self.build_locks.lock().entry(tag.to_string()).or_default().clone()
    }

    /// Ensure the image for `(agent, caps)` exists, building it on miss.
    /// Returns the tag. Refreshes the last-used stamp either way.
    pub async fn ensure(
        &self,
        agent: AgentKind,
        caps: &[Capability],
        base_image: &str,
    ) -> Result<String, RuntimeError> {
        let tag = self.tag_for(agent, caps);
        let lock = self.build_lock(&tag);
        let _guard = lock.lock().await;

        if !self.runtime.image_exists(&tag).await? {
            let dockerfile = image::dockerfile(base_image, agent, caps);
            tracing::info!(%tag, %agent, "building worker image");
            self.runtime.build_image(&tag, &dockerfile).await?;
        }

        if let Err(err) = self.lru.touch(&tag, self.clock.unix_seconds()).await {
            tracing::warn!(%tag, error = %err, "failed to stamp image last-used");
        }
        Ok(tag)
    }

    /// Remove cached images whose last use is older than `retention`,
    /// never touching a tag in `live`. Returns the removed tags.
    pub async fn gc(
        &self,
        retention: Duration,
        live: &HashSet<String>,
    ) -> Result<Vec<String>, RuntimeError> {
        let now = self.clock.unix_seconds();
        let entries = match self.lru.entries().await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "image GC skipped: LRU unreadable");
                return Ok(Vec::new());
            }
        };

        let cached = self.runtime.list_images(&self.image_prefix).await?;
        let cached: HashSet<&str> = cached.iter().map(String::as_str).collect();

        let mut removed = Vec::new();
        for (tag, last_used) in entries {
            if live.contains(&tag) {
                continue;
            }
            if now.saturating_sub(last_used) <= retention.as_secs() {
                continue;
            }
            if cached.contains(tag.as_str()) {
                if let Err(err) = self.runtime.remove_image(&tag).await {
                    tracing::warn!(%tag, error = %err, "image removal failed, keeping LRU entry");
                    continue;
                }
            }
            if let Err(err) = self.lru.forget(&tag).await {
                tracing::warn!(%tag, error = %err, "failed to drop image LRU entry");
            }
            tracing::info!(%tag, "garbage-collected worker image");
            removed.push(tag);
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
