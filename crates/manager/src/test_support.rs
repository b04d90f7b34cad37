// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for manager tests.

use crate::config::ManagerConfig;
use crate::image::{ImageLru, ImageStore};
use crate::manager::WorkerManager;
use crate::runtime::fake::FakeRuntime;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wharf_broker::BrokerError;
use wharf_core::FakeClock;

/// In-memory image LRU.
#[derive(Default)]
pub struct FakeLru {
    stamps: Mutex<HashMap<String, u64>>,
}

impl FakeLru {
    pub fn last_used(&self, tag: &str) -> Option<u64> {
        self.stamps.lock().get(tag).copied()
    }
}

#[async_trait]
impl ImageLru for FakeLru {
    async fn touch(&self, tag: &str, unix_seconds: u64) -> Result<(), BrokerError> {
        self.stamps.lock().insert(tag.to_string(), unix_seconds);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<(String, u64)>, BrokerError> {
        Ok(self.stamps.lock().iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    async fn forget(&self, tag: &str) -> Result<(), BrokerError> {
        self.stamps.lock().remove(tag);
        Ok(())
    }
}

pub fn test_config() -> ManagerConfig {
    ManagerConfig {
        redis_url: "redis://127.0.0.1:6379/0".into(),
        stream_prefix: "worker".into(),
        container_prefix: "wharf".into(),
        image_prefix: "wharf".into(),
        claude_base_image: "claude-base:latest".into(),
        factory_base_image: "factory-base:latest".into(),
        network: None,
        consumer_name: "wharfd-test".into(),
        command_block: Duration::from_millis(100),
        exec_timeout: Duration::from_secs(5),
        idle_threshold: Duration::from_secs(1_800),
        reaper_interval: Duration::from_secs(60),
        image_gc_interval: Duration::from_secs(3_600),
        image_retention: Duration::from_secs(7 * 24 * 3_600),
        host_claude_dir: Some("/home/host/.claude".into()),
        api_key: Some("sk-test".into()),
    }
}

pub struct Harness {
    pub runtime: FakeRuntime,
    pub lru: Arc<FakeLru>,
    pub clock: FakeClock,
    pub manager: Arc<WorkerManager<FakeRuntime, FakeClock>>,
}

/// Manager wired to a fake runtime, fake LRU, and fake clock.
pub fn harness() -> Harness {
    harness_with_config(test_config())
}

pub fn harness_with_config(cfg: ManagerConfig) -> Harness {
    let runtime = FakeRuntime::new();
    let lru = Arc::new(FakeLru::default());
    let clock = FakeClock::new();
    let images = ImageStore::new(
        Arc::new(runtime.clone()),
        lru.clone(),
        clock.clone(),
        cfg.image_prefix.clone(),
    );
    let manager = Arc::new(WorkerManager::new(
        Arc::new(runtime.clone()),
        images,
        Arc::new(cfg),
        clock.clone(),
    ));
    Harness { runtime, lru, clock, manager }
}
