// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent specs: analyze mode and parse-error recovery.

use super::prelude::*;
use rb_adapters::{ScriptedAgent, ScriptedCheckpoint};
use rb_core::{AgentMode, Step, TraceEvent};
use rb_engine::{RunOpts, WorkflowBuilder};
use serde_json::json;

fn review_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"summary": {"type": "string"}, "score": {"type": "number"}},
        "required": ["summary", "score"]
    })
}

#[tokio::test]
async fn analyze_mode_parses_the_scripted_reply() {
    let agent = ScriptedAgent::new().respond_text(".*", r#"{"summary":"all good","score":95}"#);
    let step = Step::agent("review", any_schema(), review_schema(), AgentMode::Analyze, |_| {
        "review the latest changes".to_string()
    });
    let workflow =
        WorkflowBuilder::new("analyze", any_schema()).pipe_prev(step).done(review_schema());

    let outcome = engine_with(agent, ScriptedCheckpoint::new())
        .run(&workflow, json!({}), RunOpts::default())
        .await
        .unwrap();
    assert_eq!(outcome.output, json!({"summary": "all good", "score": 95}));

    let kinds: Vec<&str> = outcome.trace.events.iter().map(TraceEvent::kind).collect();
    for expected in ["agent:session_created", "agent:prompt_sent", "agent:response"] {
        assert!(kinds.contains(&expected), "missing {expected}");
    }
}

#[tokio::test]
async fn analyze_mode_recovers_json_buried_in_prose() {
    let agent = ScriptedAgent::new().respond_text(
        ".*",
        r#"Happy to help! Based on my analysis the answer is {"x":1} — anything else?"#,
    );
    let step = Step::agent(
        "extract",
        any_schema(),
        json!({"type": "object", "properties": {"x": {"type": "number"}}, "required": ["x"]}),
        AgentMode::Analyze,
        |_| "extract the value".to_string(),
    );
    let workflow = WorkflowBuilder::new("recover", any_schema()).pipe_prev(step).done(any_schema());

    let outcome = engine_with(agent, ScriptedCheckpoint::new())
        .run(&workflow, json!({}), RunOpts::default())
        .await
        .unwrap();
    assert_eq!(outcome.output, json!({"x": 1}));
}
