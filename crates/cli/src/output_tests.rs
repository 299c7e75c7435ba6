// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn run_row_shortens_ids_and_formats_elapsed() {
    let run = json!({
        "run_id": "run-0123456789abcdef",
        "workflow_id": "deploy",
        "status": "success",
        "started_at_ms": 1_000,
        "completed_at_ms": 4_200,
    });
    let row = run_row(&run);
    assert!(row.starts_with("run-01234567"));
    assert!(row.contains("deploy"));
    assert!(row.contains("success"));
    assert!(row.contains("3.2s"));
}

#[test]
fn run_row_tolerates_missing_fields() {
    let row = run_row(&json!({}));
    assert!(row.contains('?'));
    assert!(row.contains('-'));
}

#[yare::parameterized(
    step_error = { json!({"type": "step:error", "step_id": "s", "error": {"kind": "timeout"}}), "timeout" },
    skipped    = { json!({"type": "step:skipped", "step_id": "s", "reason": "replayed from snapshot"}), "replayed" },
    waiting    = { json!({"type": "checkpoint:waiting", "step_id": "s", "prompt": "ok?"}), "ok?" },
)]
fn event_line_carries_detail(event: serde_json::Value, needle: &str) {
    assert!(event_line(&event).contains(needle));
}

#[test]
fn workflow_events_omit_the_step_column() {
    let line = event_line(&json!({"type": "workflow:start"}));
    assert!(line.starts_with("workflow:start"));
}
