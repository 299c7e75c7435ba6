// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint resume spec: suspend, resume into a fresh run, replay the
//! prefix, resolve the fresh checkpoint, finish.

use super::prelude::*;
use rb_adapters::ScriptedAgent;
use rb_core::{RunStatus, TraceEvent};
use serde_json::json;

#[tokio::test]
async fn resume_from_a_suspended_run() {
    let router = router_with(vec![approval_workflow()], ScriptedAgent::new());

    // First run suspends at the approval checkpoint.
    let first = router.submit("approval-flow", json!(21)).unwrap();
    let first_checkpoint = wait_for_pending_checkpoint(&router, &first).await;
    assert_eq!(first_checkpoint.step_id, "approval");
    assert!(first_checkpoint.prompt.contains("42"));

    // Resume into a second run without resolving the first.
    let (second, resumed_from) = router.resume("approval-flow", first.as_str()).unwrap();
    assert_eq!(resumed_from, first);

    // The resumed run replays `compute` and registers a fresh checkpoint.
    let second_checkpoint = wait_for_pending_checkpoint(&router, &second).await;
    assert_ne!(second_checkpoint.checkpoint_id, first_checkpoint.checkpoint_id);

    router
        .resolve_checkpoint(
            second.as_str(),
            second_checkpoint.checkpoint_id.as_str(),
            json!({"approved": true}),
        )
        .unwrap();

    let state = wait_for_status(&router, &second, RunStatus::Success).await;
    assert_eq!(state.output, Some(json!(1)));
    assert!(state.pending_checkpoints.is_empty());

    let skipped: Vec<&str> = state
        .trace_events
        .iter()
        .filter_map(|event| match event {
            TraceEvent::StepSkipped { step_id, .. } => Some(step_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec!["compute"]);

    // The replayed prefix never re-executes.
    assert!(!state.trace_events.iter().any(|event| {
        matches!(event, TraceEvent::StepStart { step_id, .. } if step_id == "compute")
    }));
}
