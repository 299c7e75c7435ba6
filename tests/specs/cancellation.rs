// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation spec: an explicit cancel settles as cancelled, never as
//! failure.

use super::prelude::*;
use rb_adapters::ScriptedAgent;
use rb_core::{RunStatus, Step, StepError};
use rb_engine::WorkflowBuilder;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn cancelled_shell_run_settles_as_cancelled() {
    let sleepy = Step::shell(
        "sleepy",
        any_schema(),
        any_schema(),
        |_| "sleep 1".to_string(),
        |_stdout, _exit| Ok(json!(null)),
    );
    let workflow = WorkflowBuilder::new("sleeper", any_schema()).pipe_prev(sleepy).done(any_schema());
    let router = router_with(vec![workflow], ScriptedAgent::new());

    let run_id = router.submit("sleeper", json!(null)).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    router.cancel(run_id.as_str()).unwrap();

    let state = wait_for_status(&router, &run_id, RunStatus::Cancelled).await;
    assert_eq!(state.status, RunStatus::Cancelled);

    // The step itself recorded an abort, not a shell failure.
    let aborted = state.trace_events.iter().any(|event| {
        matches!(
            event,
            rb_core::TraceEvent::StepError { error, .. } if matches!(error, StepError::Aborted)
        )
    });
    assert!(aborted, "expected an aborted step in {:?}", state.trace_events);
}
