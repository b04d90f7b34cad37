// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::harness;
use wharf_core::{AgentKind, WorkerConfig};

#[tokio::test]
async fn lifecycle_events_refresh_activity() {
    let h = harness();
    let id = h.manager.create(WorkerConfig::new("w1", AgentKind::Claude)).await.unwrap();

    h.clock.advance(Duration::from_secs(1_700));
    observe(h.manager.as_ref(), &LifecycleEvent::started(id.clone()));
    h.clock.advance(Duration::from_secs(200));

    // 1900s since creation but only 200s since the started event.
    assert!(h.manager.pause_idle(Duration::from_secs(1_800)).await.is_empty());
}

#[tokio::test]
async fn events_for_unknown_workers_are_ignored() {
    let h = harness();
    // Must not panic or create records.
    observe(h.manager.as_ref(), &LifecycleEvent::stopped(wharf_core::WorkerId::new("ghost")));
    assert!(h.manager.status(&wharf_core::WorkerId::new("ghost")).is_err());
}

#[test]
fn only_completed_and_failed_end_a_task() {
    assert!(ends_task(LifecyclePhase::Completed));
    assert!(ends_task(LifecyclePhase::Failed));
    assert!(!ends_task(LifecyclePhase::Started));
    assert!(!ends_task(LifecyclePhase::Stopped));
}
