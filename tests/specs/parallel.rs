// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel fan-in spec: upper ∥ length over one string input.

use super::prelude::*;
use rb_core::{map_previous, Step, TraceEvent};
use rb_engine::{RunOpts, WorkflowBuilder};
use serde_json::json;

#[tokio::test]
async fn parallel_fan_in_collects_a_tuple() {
    let upper = Step::function("upper", string_schema(), string_schema(), |input, _ctx| async move {
        Ok(json!(input.as_str().unwrap_or("").to_uppercase()))
    });
    let length = Step::function("length", string_schema(), number_schema(), |input, _ctx| async move {
        Ok(json!(input.as_str().unwrap_or("").len()))
    });
    let workflow = WorkflowBuilder::new("fan-in", string_schema())
        .parallel(vec![(upper, map_previous()), (length, map_previous())])
        .done(any_schema());

    let outcome = engine().run(&workflow, json!("hello"), RunOpts::default()).await.unwrap();
    assert_eq!(outcome.output, json!(["HELLO", 5]));

    // Both branches produce a start and a complete.
    for step_id in ["upper", "length"] {
        let starts = outcome
            .trace
            .events
            .iter()
            .filter(|e| matches!(e, TraceEvent::StepStart { step_id: id, .. } if id == step_id))
            .count();
        let completes = outcome
            .trace
            .events
            .iter()
            .filter(|e| matches!(e, TraceEvent::StepComplete { step_id: id, .. } if id == step_id))
            .count();
        assert_eq!((starts, completes), (1, 1), "step {step_id}");
    }
}
