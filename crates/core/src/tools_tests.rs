// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn tool_group_parse_roundtrip() {
    for group in [
        ToolGroup::Project,
        ToolGroup::Deploy,
        ToolGroup::Engineering,
        ToolGroup::Infra,
        ToolGroup::Diagnose,
        ToolGroup::Respond,
    ] {
        assert_eq!(group.as_str().parse::<ToolGroup>().unwrap(), group);
    }
}

#[test]
fn tool_group_parse_rejects_unknown() {
    assert!("shell".parse::<ToolGroup>().is_err());
}

#[test]
fn join_is_comma_separated() {
    assert_eq!(join(&[ToolGroup::Project, ToolGroup::Respond]), "project,respond");
    assert_eq!(join(&[]), "");
}
