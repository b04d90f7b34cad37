// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn plain_block_extracts() {
    let out = extract_result(r#"done. <result>{"status":"ok","files":3}</result>"#).unwrap();
    assert_eq!(out, Some(json!({"status":"ok","files":3})));
}

#[test]
fn whitespace_inside_markers_is_tolerated() {
    let out = extract_result("<result>\n  {\"ok\": true}\n</result>").unwrap();
    assert_eq!(out, Some(json!({"ok": true})));
}

#[test]
fn block_spanning_newlines_extracts() {
    let stdout = "prefix\n<result>{\n  \"a\": 1,\n  \"b\": [1, 2]\n}</result>\nsuffix";
    let out = extract_result(stdout).unwrap();
    assert_eq!(out, Some(json!({"a": 1, "b": [1, 2]})));
}

#[test]
fn first_block_wins() {
    let stdout = r#"<result>{"n":1}</result> later <result>{"n":2}</result>"#;
    let out = extract_result(stdout).unwrap();
    assert_eq!(out, Some(json!({"n": 1})));
}

#[test]
fn no_markers_is_none() {
    assert_eq!(extract_result("ok, done").unwrap(), None);
    assert_eq!(extract_result("").unwrap(), None);
}

#[test]
fn markers_are_case_sensitive() {
    assert_eq!(extract_result(r#"<RESULT>{"n":1}</RESULT>"#).unwrap(), None);
}

#[test]
fn malformed_json_is_a_hard_error() {
    let err = extract_result("<result>{not json}</result>").unwrap_err();
    assert!(err.to_string().contains("invalid JSON in result block"));
}

#[test]
fn empty_block_is_a_hard_error() {
    assert!(extract_result("<result></result>").is_err());
}

#[test]
fn scalar_json_values_are_accepted() {
    assert_eq!(extract_result("<result>42</result>").unwrap(), Some(json!(42)));
    assert_eq!(extract_result(r#"<result>"text"</result>"#).unwrap(), Some(json!("text")));
}

#[test]
fn cli_envelope_is_unwrapped_recursively() {
    // claude --output-format json wraps everything; the markers live in
    // the `result` text with escaped quotes.
    let stdout = serde_json::to_string(&json!({
        "type": "result",
        "session_id": "sess-1",
        "result": "work done\n<result>{\"status\": \"ok\"}</result>\n"
    }))
    .unwrap();
    let out = extract_result(&stdout).unwrap();
    assert_eq!(out, Some(json!({"status": "ok"})));
}

#[test]
fn envelope_without_markers_falls_through_to_none() {
    let stdout = r#"{"type":"result","result":"all done, nothing structured"}"#;
    assert_eq!(extract_result(stdout).unwrap(), None);
}

#[test]
fn envelope_with_bad_inner_json_is_a_hard_error() {
    let stdout = serde_json::to_string(&json!({
        "result": "<result>{oops}</result>"
    }))
    .unwrap();
    assert!(extract_result(&stdout).is_err());
}

#[test]
fn unclosed_marker_is_none() {
    assert_eq!(extract_result(r#"<result>{"n":1}"#).unwrap(), None);
}
