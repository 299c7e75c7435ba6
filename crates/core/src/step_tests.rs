// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{number_schema, step_context, string_schema};
use serde_json::json;

#[tokio::test]
async fn function_step_runs_body() {
    let step = Step::function("double", number_schema(), number_schema(), |input, _ctx| async move {
        let n = input.as_f64().unwrap_or(0.0);
        Ok(json!(n * 2.0))
    });
    let StepKind::Fn { run } = &step.kind else {
        panic!("expected fn kind");
    };
    let out = run(json!(5), step_context("double")).await.unwrap();
    assert_eq!(out, json!(10.0));
}

#[test]
fn shell_step_builds_command_from_input() {
    let step = Step::shell(
        "greet",
        string_schema(),
        string_schema(),
        |input| format!("echo {}", input.as_str().unwrap_or("")),
        |stdout, _exit| Ok(json!(stdout.trim())),
    );
    let StepKind::Shell { command, parse, timeout_ms } = &step.kind else {
        panic!("expected shell kind");
    };
    assert_eq!(command(&json!("world")), "echo world");
    assert_eq!(parse("hi\n", 0).unwrap(), json!("hi"));
    assert!(timeout_ms.is_none());
}

#[test]
fn shell_timeout_is_settable() {
    let step = Step::shell("s", json!(true), json!(true), |_| "true".into(), |_, _| Ok(json!(null)))
        .with_shell_timeout_ms(2_000);
    let StepKind::Shell { timeout_ms, .. } = &step.kind else {
        panic!("expected shell kind");
    };
    assert_eq!(*timeout_ms, Some(2_000));
}

#[test]
fn agent_opts_default_timeout() {
    let opts = AgentStepOpts::default();
    assert_eq!(opts.timeout_ms, DEFAULT_AGENT_TIMEOUT_MS);
    assert!(opts.system_prompt.is_none());
}

#[test]
fn with_agent_opts_only_touches_agent_steps() {
    let step = Step::checkpoint("approve", json!(true), json!(true), |_| "ok?".into())
        .with_agent_opts(AgentStepOpts { timeout_ms: 1, ..AgentStepOpts::default() });
    assert_eq!(step.kind.name(), "checkpoint");
}

#[yare::parameterized(
    sequential = { StepNode::Sequential { step: Step::checkpoint("a", json!(true), json!(true), |_| String::new()), mapper: map_previous() }, vec!["a"] },
)]
fn node_step_ids(node: StepNode, expected: Vec<&str>) {
    assert_eq!(node.step_ids(), expected);
}

#[test]
fn parallel_node_lists_branches_in_order() {
    let node = StepNode::Parallel {
        branches: vec![
            (Step::checkpoint("left", json!(true), json!(true), |_| String::new()), map_previous()),
            (Step::checkpoint("right", json!(true), json!(true), |_| String::new()), map_previous()),
        ],
    };
    assert_eq!(node.step_ids(), vec!["left", "right"]);
}

#[test]
fn mapper_helpers() {
    let wf_input = json!({"n": 1});
    let previous = json!(42);
    assert_eq!(map_previous()(&wf_input, &previous).unwrap(), json!(42));
    assert_eq!(map_workflow_input()(&wf_input, &previous).unwrap(), json!({"n": 1}));
}
