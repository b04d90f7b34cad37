// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level contract tests.
//!
//! Pins the wire-visible behavior the rest of the ecosystem depends on:
//! command/response JSON shapes, the capability→image-tag derivation, and
//! the result-block extraction. These are the contracts other services
//! integrate against, so they get golden values, not just round-trips.

use serde_json::json;
use wharf_core::{
    capability_hash, dockerfile, image_tag, AgentKind, Capability, Command, LifecycleEvent,
    LifecyclePhase, RawOutput, Response, TaskMessage, WorkerId, WorkerState,
};
use yare::parameterized;

// -- capability hashing (golden values) --

#[parameterized(
    claude_git = { AgentKind::Claude, &[Capability::Git], "68638e26c0eb" },
    claude_docker_git = { AgentKind::Claude, &[Capability::Docker, Capability::Git], "a3ab08344f88" },
    claude_empty = { AgentKind::Claude, &[], "9f376e79fafb" },
    factory_empty = { AgentKind::Factory, &[], "7df913e391df" },
)]
fn capability_hash_is_pinned(agent: AgentKind, caps: &[Capability], expected: &str) {
    assert_eq!(capability_hash(agent, caps), expected);
}

#[test]
fn image_tag_ignores_order_and_duplicates() {
    let a = image_tag("wharf", AgentKind::Claude, &[Capability::Docker, Capability::Git]);
    let b = image_tag(
        "wharf",
        AgentKind::Claude,
        &[Capability::Git, Capability::Docker, Capability::Git],
    );
    assert_eq!(a, b);
    assert_eq!(a, "wharf:a3ab08344f88");
}

#[test]
fn agent_kind_distinguishes_tags() {
    assert_ne!(
        image_tag("wharf", AgentKind::Claude, &[]),
        image_tag("wharf", AgentKind::Factory, &[])
    );
}

#[test]
fn dockerfile_for_s1_scenario() {
    let df = dockerfile("worker-base:latest", AgentKind::Claude, &[Capability::Git]);
    assert!(df.starts_with("FROM worker-base:latest"));
    assert!(df.contains("apt-get install -y --no-install-recommends git"));
    assert!(df.ends_with("LABEL wharf.agent_kind=claude"));
}

// -- command bus wire shapes --

#[test]
fn create_command_wire_shape() {
    let json_text = r#"{
        "command": "create",
        "request_id": "req-1",
        "config": {
            "name": "w1",
            "agent_type": "claude",
            "worker_type": "developer",
            "capabilities": ["GIT"],
            "auth_mode": "host_session",
            "ttl_hours": 2,
            "mount_session_volume": true
        }
    }"#;
    let command: Command = serde_json::from_str(json_text).unwrap();
    let Command::Create { request_id, config } = &command else {
        panic!("wrong variant");
    };
    assert_eq!(request_id, "req-1");
    assert_eq!(config.name, "w1");
    assert_eq!(config.ttl_hours, 2);

    // Round-trip keeps the tag.
    let value = serde_json::to_value(&command).unwrap();
    assert_eq!(value["command"], "create");
    assert_eq!(value["config"]["agent_type"], "claude");
}

#[test]
fn response_success_wire_shape() {
    let response = Response::Create {
        request_id: "req-1".into(),
        success: true,
        worker_id: Some(WorkerId::new("w1")),
        error: None,
    };
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"command": "create", "request_id": "req-1", "success": true, "worker_id": "w1"})
    );
}

#[test]
fn response_failure_carries_error_string() {
    let command: Command = serde_json::from_str(
        r#"{"command":"delete","request_id":"req-2","worker_id":"w9"}"#,
    )
    .unwrap();
    let response = command.failure("worker not found: w9");
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["command"], "delete");
    assert_eq!(value["success"], false);
    assert_eq!(value["error"], "worker not found: w9");
}

#[test]
fn worker_states_serialize_lowercase() {
    for (state, text) in [
        (WorkerState::Creating, "creating"),
        (WorkerState::Running, "running"),
        (WorkerState::Paused, "paused"),
        (WorkerState::Stopped, "stopped"),
        (WorkerState::Failed, "failed"),
        (WorkerState::Expired, "expired"),
    ] {
        assert_eq!(serde_json::to_value(state).unwrap(), json!(text));
    }
}

// -- lifecycle and task streams --

#[test]
fn lifecycle_event_wire_shape() {
    let event = LifecycleEvent::failed(WorkerId::new("w1"), "boom", Some(2));
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["worker_id"], "w1");
    assert_eq!(value["event"], "failed");
    assert_eq!(value["error"], "boom");
    assert_eq!(value["exit_code"], 2);
    assert!(value.get("result").is_none());
    assert!(value["timestamp"].is_string());
}

#[test]
fn lifecycle_phases_are_the_four_spec_values() {
    for (phase, text) in [
        (LifecyclePhase::Started, "started"),
        (LifecyclePhase::Completed, "completed"),
        (LifecyclePhase::Failed, "failed"),
        (LifecyclePhase::Stopped, "stopped"),
    ] {
        assert_eq!(serde_json::to_value(phase).unwrap(), json!(text));
    }
}

#[test]
fn task_message_accepts_minimal_payload() {
    let task: TaskMessage = serde_json::from_str(r#"{"content":"Do X"}"#).unwrap();
    assert_eq!(task.content, "Do X");
}

#[test]
fn raw_output_fallback_matches_s2() {
    let value = serde_json::to_value(RawOutput::new("ok, done")).unwrap();
    assert_eq!(
        value,
        json!({"raw_output": "ok, done", "status": "no_structured_result"})
    );
}

// -- result extraction (S1/S2 wire contract) --

#[test]
fn result_extraction_happy_path() {
    let stdout = "thinking...\n<result>{\"answer\": 42}</result>\n";
    let result = wharf_wrapper::extract_result(stdout).unwrap();
    assert_eq!(result, Some(json!({"answer": 42})));
}

#[test]
fn result_extraction_no_markers_is_absent() {
    assert_eq!(wharf_wrapper::extract_result("ok, done").unwrap(), None);
}

#[test]
fn result_extraction_prefix_and_suffix_are_ignored() {
    // parse(P ++ "<result>" ++ json ++ "</result>" ++ S) == parse(json)
    let json_value = json!({"nested": {"deep": [1, 2, 3]}});
    let stdout = format!(
        "PREFIX {}<result>{}</result> SUFFIX",
        "noise ",
        serde_json::to_string(&json_value).unwrap()
    );
    assert_eq!(wharf_wrapper::extract_result(&stdout).unwrap(), Some(json_value));
}
