// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact spec: a finished run's trace round-trips through the git
//! store byte-for-byte under canonical serialization.

use super::prelude::*;
use rb_adapters::{ScriptedAgent, SystemShell};
use rb_core::{RunStatus, Trace, TraceStatus};
use rb_daemon::{Router, WorkflowRegistry};
use rb_engine::WorkflowBuilder;
use serde_json::json;
use std::time::Duration;

fn init_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let status = std::process::Command::new("git")
        .args(["init", "--quiet"])
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());
    dir
}

#[tokio::test]
async fn stored_trace_round_trips() {
    let repo = init_repo();
    let workflow = WorkflowBuilder::new("linear", number_schema())
        .pipe_prev(double_step())
        .pipe_prev(add_ten_step())
        .done(number_schema());
    let registry = WorkflowRegistry::new().register(workflow);
    let router: SpecRouter = Router::new(
        registry,
        SystemShell,
        ScriptedAgent::new(),
        Some(rb_storage::GitStore::new(repo.path().to_path_buf())),
        std::env::temp_dir(),
    );

    let run_id = router.submit("linear", json!(5)).unwrap();
    let state = wait_for_status(&router, &run_id, RunStatus::Success).await;
    assert_eq!(state.output, Some(json!(20)));

    // The terminal artifact write is async; poll the store.
    let artifacts = router.artifacts().unwrap().clone();
    let deadline = tokio::time::Instant::now() + SPEC_WAIT_MAX;
    let stored: Trace = loop {
        if let Ok(trace) = artifacts.get_trace(run_id.as_str()).await {
            break trace;
        }
        assert!(tokio::time::Instant::now() < deadline, "artifacts never appeared");
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    assert_eq!(stored.run_id, run_id);
    assert_eq!(stored.status, TraceStatus::Success);
    assert_eq!(stored.events, state.trace_events);
    // Canonical serialization equality.
    assert_eq!(
        serde_json::to_string(&stored.events).unwrap(),
        serde_json::to_string(&state.trace_events).unwrap()
    );

    // Metadata is listed with ISO-8601 timestamps and the right shape.
    let listed = artifacts.list(&rb_storage::ListFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].metadata.workflow_id, "linear");
    assert_eq!(listed[0].metadata.output, Some(json!(20)));
}
