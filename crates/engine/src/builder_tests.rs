// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rb_core::test_support::{number_schema, string_schema};
use rb_core::{Step, StepNode};
use serde_json::json;

fn step(id: &str) -> Step {
    Step::checkpoint(id, json!(true), json!(true), |_| String::new())
}

#[test]
fn pipe_appends_sequential_nodes_in_order() {
    let workflow = WorkflowBuilder::new("wf", number_schema())
        .pipe_prev(step("a"))
        .pipe_prev(step("b"))
        .done(string_schema());

    assert_eq!(workflow.id, "wf");
    assert_eq!(workflow.step_ids(), vec!["a", "b"]);
    assert!(matches!(workflow.steps[0], StepNode::Sequential { .. }));
}

#[test]
fn parallel_preserves_branch_declaration_order() {
    let workflow = WorkflowBuilder::new("wf", number_schema())
        .parallel(vec![
            (step("left"), map_previous()),
            (step("right"), map_previous()),
        ])
        .done(string_schema());

    assert_eq!(workflow.step_ids(), vec!["left", "right"]);
    assert!(matches!(workflow.steps[0], StepNode::Parallel { .. }));
}

#[test]
fn done_freezes_the_schemas() {
    let workflow = WorkflowBuilder::new("wf", number_schema()).done(string_schema());
    assert_eq!(workflow.input_schema, number_schema());
    assert_eq!(workflow.output_schema, string_schema());
    assert_eq!(workflow.step_count(), 0);
}

#[test]
fn frozen_workflows_are_independent_clones() {
    let workflow = WorkflowBuilder::new("wf", number_schema()).pipe_prev(step("a")).done(json!(true));
    let copy = workflow.clone();
    drop(workflow);
    assert_eq!(copy.step_ids(), vec!["a"]);
}
