// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "tg-42", "agent-tg-42" },
    upper = { "User99", "agent-user99" },
    spaces = { "a b c", "agent-a-b-c" },
    symbols = { "@@!!", "agent-unnamed" },
    leading_junk = { "__x__", "agent-x" },
)]
fn worker_names_are_valid(principal: &str, expected: &str) {
    let name = worker_name_for(principal);
    assert_eq!(name, expected);
    assert!(WorkerConfig::new(name, AgentKind::Claude).validate().is_ok());
}

#[test]
fn worker_name_is_bounded() {
    let name = worker_name_for(&"x".repeat(500));
    assert!(name.len() <= 60);
    assert!(WorkerConfig::new(name, AgentKind::Claude).validate().is_ok());
}

#[test]
fn shell_quote_wraps_and_escapes() {
    assert_eq!(shell_quote("hello"), "'hello'");
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
    assert_eq!(shell_quote("a;rm -rf /"), "'a;rm -rf /'");
}

#[test]
fn claude_shell_command_first_turn() {
    let cmd = agent_shell_command(AgentKind::Claude, "Do X", None);
    assert_eq!(
        cmd,
        "claude --dangerously-skip-permissions -p 'Do X' --output-format json"
    );
}

#[test]
fn claude_shell_command_resumes() {
    let cmd = agent_shell_command(AgentKind::Claude, "More", Some("sess-1"));
    assert!(cmd.ends_with("--resume 'sess-1'"));
}

#[test]
fn factory_shell_command_has_no_resume() {
    let cmd = agent_shell_command(AgentKind::Factory, "Do Y", Some("sess-1"));
    assert_eq!(cmd, "droid exec -o json 'Do Y'");
}

#[test]
fn agent_stdout_envelope_parses() {
    let turn = parse_agent_stdout(
        r#"{"type":"result","result":"All done.","session_id":"sess-2"}"#,
    );
    assert_eq!(turn.reply, "All done.");
    assert_eq!(turn.session_id.as_deref(), Some("sess-2"));
}

#[test]
fn agent_stdout_envelope_without_session() {
    let turn = parse_agent_stdout(r#"{"result":"hi"}"#);
    assert_eq!(turn.reply, "hi");
    assert_eq!(turn.session_id, None);
}

#[test]
fn agent_stdout_plain_text_passes_through() {
    let turn = parse_agent_stdout("not json at all\n");
    assert_eq!(turn.reply, "not json at all");
    assert_eq!(turn.session_id, None);
}

#[test]
fn agent_stdout_envelope_missing_result_falls_back_to_raw() {
    let turn = parse_agent_stdout(r#"{"session_id":"s3","other":1}"#);
    assert_eq!(turn.reply, r#"{"session_id":"s3","other":1}"#);
    assert_eq!(turn.session_id.as_deref(), Some("s3"));
}
