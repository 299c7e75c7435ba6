// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::step::{map_previous, Step};
use crate::test_support::step_context;
use serde_json::json;

fn workflow() -> Workflow {
    Workflow {
        id: "pipeline".into(),
        input_schema: json!({"type": "number"}),
        output_schema: json!({"type": "string"}),
        steps: vec![
            StepNode::Sequential {
                step: Step::checkpoint("first", json!(true), json!(true), |_| String::new()),
                mapper: map_previous(),
            },
            StepNode::Parallel {
                branches: vec![
                    (Step::checkpoint("left", json!(true), json!(true), |_| String::new()), map_previous()),
                    (Step::checkpoint("right", json!(true), json!(true), |_| String::new()), map_previous()),
                ],
            },
        ],
    }
}

#[test]
fn step_ids_flatten_in_graph_order() {
    assert_eq!(workflow().step_ids(), vec!["first", "left", "right"]);
    assert_eq!(workflow().step_count(), 3);
}

#[test]
fn contains_step_checks_all_branches() {
    let wf = workflow();
    assert!(wf.contains_step("right"));
    assert!(!wf.contains_step("missing"));
}

#[test]
fn summary_reports_schemas_and_count() {
    let summary = workflow().summary();
    assert_eq!(summary.id, "pipeline");
    assert_eq!(summary.step_count, 3);
    assert_eq!(summary.input_schema, json!({"type": "number"}));
}

#[tokio::test]
async fn as_step_reports_missing_engine() {
    let wf = Arc::new(workflow());
    let step = wf.as_step();
    assert_eq!(step.id, "pipeline");
    assert_eq!(step.input_schema, wf.input_schema);

    // The test context has no engine; invocation surfaces an execution error.
    let StepKind::Fn { run } = &step.kind else {
        panic!("as_step must produce an fn step");
    };
    let err = run(json!(5), step_context("pipeline")).await.unwrap_err();
    assert!(matches!(err, StepError::ExecutionError { .. }));
}
