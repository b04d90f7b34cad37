// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::harness;
use std::collections::HashMap;
use wharf_core::{AgentKind, WorkerConfig};

fn die_event(worker_id: &str, exit_code: &str) -> ContainerEvent {
    let mut attributes = HashMap::new();
    attributes.insert(labels::WORKER_ID.to_string(), worker_id.to_string());
    attributes.insert("exitCode".to_string(), exit_code.to_string());
    attributes.insert("name".to_string(), format!("wharf-{worker_id}"));
    ContainerEvent { action: "die".to_string(), attributes }
}

#[tokio::test]
async fn nonzero_exit_triggers_synthesis_and_failed_state() {
    let h = harness();
    let id = h.manager.create(WorkerConfig::new("w1", AgentKind::Claude)).await.unwrap();

    let result = observe_die_event(h.manager.as_ref(), &die_event("w1", "137"));

    assert_eq!(result, Some((id.clone(), 137)));
    assert_eq!(h.manager.status(&id).unwrap().state, WorkerState::Failed);
}

#[tokio::test]
async fn clean_exit_marks_stopped_without_synthesis() {
    let h = harness();
    let id = h.manager.create(WorkerConfig::new("w1", AgentKind::Claude)).await.unwrap();

    let result = observe_die_event(h.manager.as_ref(), &die_event("w1", "0"));

    assert_eq!(result, None);
    assert_eq!(h.manager.status(&id).unwrap().state, WorkerState::Stopped);
}

#[tokio::test]
async fn die_after_delete_is_not_a_crash() {
    let h = harness();
    let id = h.manager.create(WorkerConfig::new("w1", AgentKind::Claude)).await.unwrap();
    h.manager.delete(&id).await.unwrap();

    let result = observe_die_event(h.manager.as_ref(), &die_event("w1", "137"));

    assert_eq!(result, None);
    assert_eq!(h.manager.status(&id).unwrap().state, WorkerState::Stopped);
}

#[tokio::test]
async fn unlabeled_containers_are_ignored() {
    let h = harness();
    let event = ContainerEvent {
        action: "die".to_string(),
        attributes: HashMap::from([("exitCode".to_string(), "1".to_string())]),
    };
    assert_eq!(observe_die_event(h.manager.as_ref(), &event), None);
}

#[tokio::test]
async fn non_die_actions_are_ignored() {
    let h = harness();
    h.manager.create(WorkerConfig::new("w1", AgentKind::Claude)).await.unwrap();
    let mut event = die_event("w1", "137");
    event.action = "start".to_string();
    assert_eq!(observe_die_event(h.manager.as_ref(), &event), None);
}

#[tokio::test]
async fn unknown_worker_events_are_ignored() {
    let h = harness();
    assert_eq!(observe_die_event(h.manager.as_ref(), &die_event("ghost", "2")), None);
}

#[tokio::test]
async fn missing_exit_code_reads_as_crash() {
    let h = harness();
    let id = h.manager.create(WorkerConfig::new("w1", AgentKind::Claude)).await.unwrap();
    let mut event = die_event("w1", "1");
    event.attributes.remove("exitCode");

    let result = observe_die_event(h.manager.as_ref(), &event);
    assert_eq!(result, Some((id, -1)));
}
