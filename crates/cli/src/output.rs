// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting helpers.

use rb_core::{format_elapsed_ms, short};
use serde_json::Value;

/// Width used when shortening run and checkpoint ids for display.
pub const SHORT_ID: usize = 12;

/// One run as a compact listing row.
pub fn run_row(run: &Value) -> String {
    let run_id = run["run_id"].as_str().unwrap_or("?");
    let workflow = run["workflow_id"].as_str().unwrap_or("?");
    let status = run["status"].as_str().unwrap_or("?");
    let elapsed = match (run["started_at_ms"].as_u64(), run["completed_at_ms"].as_u64()) {
        (Some(start), Some(end)) => format_elapsed_ms(end.saturating_sub(start)),
        _ => "-".to_string(),
    };
    format!("{:<14} {:<20} {:<10} {}", short(run_id, SHORT_ID), workflow, status, elapsed)
}

/// One trace event as a log line.
pub fn event_line(event: &Value) -> String {
    let kind = event["type"].as_str().unwrap_or("?");
    let step = event["step_id"].as_str().unwrap_or("");
    let detail = match kind {
        "step:error" => event["error"]["kind"].as_str().unwrap_or("").to_string(),
        "step:skipped" => event["reason"].as_str().unwrap_or("").to_string(),
        "workflow:error" => event["error"].as_str().unwrap_or("").to_string(),
        "checkpoint:waiting" => event["prompt"].as_str().unwrap_or("").to_string(),
        "agent:text" => event["text"].as_str().unwrap_or("").to_string(),
        _ => String::new(),
    };
    if step.is_empty() {
        format!("{:<24} {}", kind, detail)
    } else {
        format!("{:<24} {:<16} {}", kind, step, detail)
    }
}

/// Pretty JSON for terminal output.
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
