// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in demo workflows for the `rbd` binary.
//!
//! Workflows are code-defined; a bare daemon registers these so the
//! control plane has something inspectable out of the box. Embedders
//! construct their own registry and ignore this module.

use rb_core::{AgentMode, Step, StepError, Workflow};
use rb_engine::WorkflowBuilder;
use serde_json::json;

pub fn workflows() -> Vec<Workflow> {
    vec![math(), utc_now(), summarize()]
}

/// Two pure steps over a number.
fn math() -> Workflow {
    let number = json!({"type": "number"});
    let double = Step::function("double", number.clone(), number.clone(), |input, _ctx| async move {
        Ok(json!(input.as_i64().unwrap_or(0) * 2))
    });
    let add_ten = Step::function("add_ten", number.clone(), number.clone(), |input, _ctx| async move {
        Ok(json!(input.as_i64().unwrap_or(0) + 10))
    });
    WorkflowBuilder::new("demo-math", number.clone())
        .pipe_prev(double)
        .pipe_prev(add_ten)
        .done(number)
}

/// One shell step; no input interpolation.
fn utc_now() -> Workflow {
    let output = json!({"type": "object", "required": ["now"]});
    let step = Step::shell(
        "date",
        json!(true),
        output.clone(),
        |_input| "date -u +%Y-%m-%dT%H:%M:%SZ".to_string(),
        |stdout, exit_code| {
            if exit_code == 0 {
                Ok(json!({"now": stdout.trim()}))
            } else {
                Err(StepError::execution("date command failed"))
            }
        },
    );
    WorkflowBuilder::new("demo-utc-now", json!(true)).pipe_prev(step).done(output)
}

/// One analyze-mode agent step.
fn summarize() -> Workflow {
    let input = json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]});
    let output = json!({
        "type": "object",
        "properties": {"summary": {"type": "string"}, "score": {"type": "number"}},
        "required": ["summary", "score"]
    });
    let step = Step::agent("summarize", input.clone(), output.clone(), AgentMode::Analyze, |input| {
        format!(
            "Summarize the following text in one sentence and rate its clarity 0-100:\n\n{}",
            input.get("text").and_then(|t| t.as_str()).unwrap_or_default()
        )
    });
    WorkflowBuilder::new("demo-summarize", input).pipe_prev(step).done(output)
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
