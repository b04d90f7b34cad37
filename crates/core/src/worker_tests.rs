// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn worker_id_display() {
    let id = WorkerId::new("w-17");
    assert_eq!(id.to_string(), "w-17");
}

#[test]
fn worker_id_equality() {
    let id1 = WorkerId::new("w1");
    let id2 = WorkerId::new("w1");
    let id3 = WorkerId::new("w2");

    assert_eq!(id1, id2);
    assert_ne!(id1, id3);
    assert_eq!(id1, "w1");
}

#[test]
fn worker_id_serde() {
    let id = WorkerId::new("my-worker");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"my-worker\"");

    let parsed: WorkerId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn worker_id_borrow_allows_str_lookup() {
    use std::collections::HashMap;
    let mut map: HashMap<WorkerId, u32> = HashMap::new();
    map.insert(WorkerId::new("w1"), 1);
    assert_eq!(map.get("w1"), Some(&1));
}

#[parameterized(
    creating = { WorkerState::Creating, "creating" },
    running = { WorkerState::Running, "running" },
    paused = { WorkerState::Paused, "paused" },
    stopped = { WorkerState::Stopped, "stopped" },
    failed = { WorkerState::Failed, "failed" },
    expired = { WorkerState::Expired, "expired" },
)]
fn state_display(state: WorkerState, expected: &str) {
    assert_eq!(state.to_string(), expected);
    let json = serde_json::to_string(&state).unwrap();
    assert_eq!(json, format!("\"{expected}\""));
}

#[test]
fn terminal_states_hold_no_resources() {
    assert!(WorkerState::Stopped.is_terminal());
    assert!(WorkerState::Failed.is_terminal());
    assert!(WorkerState::Expired.is_terminal());
    assert!(!WorkerState::Running.is_terminal());
    assert!(!WorkerState::Paused.is_terminal());
    assert!(!WorkerState::Creating.is_terminal());
}

#[test]
fn live_states_accept_work() {
    assert!(WorkerState::Running.is_live());
    assert!(WorkerState::Paused.is_live());
    assert!(!WorkerState::Creating.is_live());
    assert!(!WorkerState::Stopped.is_live());
}

#[test]
fn state_machine_transitions() {
    use WorkerState::*;
    assert!(Creating.can_transition_to(Running));
    assert!(Running.can_transition_to(Paused));
    assert!(Paused.can_transition_to(Running));
    assert!(Running.can_transition_to(Stopped));
    assert!(Paused.can_transition_to(Expired));
    assert!(Creating.can_transition_to(Failed));

    // No resurrection from terminal states.
    assert!(!Stopped.can_transition_to(Running));
    assert!(!Failed.can_transition_to(Paused));
    assert!(!Expired.can_transition_to(Creating));
    // No skipping creation straight to paused.
    assert!(!Creating.can_transition_to(Paused));
}
