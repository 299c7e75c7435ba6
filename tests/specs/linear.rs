// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linear pipeline spec: double → add_ten → to_string.

use super::prelude::*;
use rb_core::TraceEvent;
use rb_engine::{RunOpts, WorkflowBuilder};
use serde_json::json;

#[tokio::test]
async fn linear_pipeline_runs_in_order() {
    let workflow = WorkflowBuilder::new("linear", number_schema())
        .pipe_prev(double_step())
        .pipe_prev(add_ten_step())
        .pipe_prev(to_string_step())
        .done(string_schema());

    let outcome = engine().run(&workflow, json!(5), RunOpts::default()).await.unwrap();
    assert_eq!(outcome.output, json!("result: 20"));

    // Eight events: start, three start/complete pairs, complete.
    let kinds: Vec<&str> = outcome.trace.events.iter().map(TraceEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "workflow:start",
            "step:start",
            "step:complete",
            "step:start",
            "step:complete",
            "step:start",
            "step:complete",
            "workflow:complete",
        ]
    );

    // The engine's reported output parses against the workflow schema.
    assert!(rb_core::is_valid(&workflow.output_schema, &outcome.output));
}
