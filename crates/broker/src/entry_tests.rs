// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::Deserialize;
use wharf_core::TaskMessage;

#[derive(Debug, PartialEq, Deserialize)]
struct Probe {
    name: String,
    count: u32,
    #[serde(default)]
    done: bool,
}

fn entry(fields: &[(&str, &str)]) -> StreamEntry {
    StreamEntry::new(
        "1-0",
        fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    )
}

#[test]
fn data_field_convention_decodes() {
    let e = entry(&[("data", r#"{"content":"Do X","task_id":"t1"}"#)]);
    let msg: TaskMessage = e.decode().unwrap();
    assert_eq!(msg.content, "Do X");
    assert_eq!(msg.task_id.as_deref(), Some("t1"));
}

#[test]
fn data_field_wins_over_named_fields() {
    let e = entry(&[("content", "ignored"), ("data", r#"{"content":"used"}"#)]);
    let msg: TaskMessage = e.decode().unwrap();
    assert_eq!(msg.content, "used");
}

#[test]
fn named_fields_convention_decodes() {
    let e = entry(&[("content", "Do Y"), ("request_id", "r1")]);
    let msg: TaskMessage = e.decode().unwrap();
    assert_eq!(msg.content, "Do Y");
    assert_eq!(msg.request_id.as_deref(), Some("r1"));
}

#[test]
fn named_fields_keep_numeric_looking_strings() {
    // A task id of "123" must stay a string even though it parses as JSON.
    let e = entry(&[("content", "x"), ("task_id", "123")]);
    let msg: TaskMessage = e.decode().unwrap();
    assert_eq!(msg.task_id.as_deref(), Some("123"));
}

#[test]
fn named_fields_coerce_when_strings_do_not_fit() {
    let e = entry(&[("name", "n"), ("count", "7"), ("done", "true")]);
    let probe: Probe = e.decode().unwrap();
    assert_eq!(probe, Probe { name: "n".into(), count: 7, done: true });
}

#[test]
fn malformed_data_blob_is_an_error() {
    let e = entry(&[("data", "{not json")]);
    assert!(matches!(e.decode::<TaskMessage>(), Err(DecodeError::Json(_))));
}

#[test]
fn empty_entry_is_an_error() {
    let e = StreamEntry::new("1-0", Vec::new());
    assert!(matches!(e.decode::<TaskMessage>(), Err(DecodeError::Empty)));
}

#[test]
fn field_lookup() {
    let e = entry(&[("a", "1"), ("b", "2")]);
    assert_eq!(e.field("b"), Some("2"));
    assert_eq!(e.field("c"), None);
}
