// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    write      = { "file_write", true },
    edit       = { "Edit", true },
    create     = { "notebook_create", true },
    patch      = { "apply_patch", true },
    read       = { "file_read", false },
    bash       = { "bash", false },
)]
fn mutating_tool_detection(name: &str, mutating: bool) {
    assert_eq!(is_mutating_tool(name), mutating);
}

#[test]
fn prompt_reply_roundtrips() {
    let reply = PromptReply {
        text: "done".into(),
        tool_calls: vec![ToolCall {
            name: "file_write".into(),
            args: serde_json::json!({"path": "a.txt"}),
            result: None,
        }],
        files_changed: vec!["a.txt".into()],
        metadata: serde_json::json!({"success": true}),
    };
    let json = serde_json::to_string(&reply).unwrap();
    let parsed: PromptReply = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, reply);
}

#[test]
fn error_kinds_are_stable() {
    assert_eq!(AgentExecutorError::PromptFailed("x".into()).kind(), "prompt_failed");
    assert_eq!(AgentExecutorError::Transport("x".into()).kind(), "transport");
}
