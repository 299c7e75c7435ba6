// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rb_adapters::{ScriptedAgent, SystemShell};
use rb_core::test_support::{any_schema, number_schema};
use rb_core::Step;
use rb_engine::WorkflowBuilder;
use serde_json::json;
use std::time::Duration;

type TestRouter = Router<SystemShell, ScriptedAgent>;

fn math_workflow() -> Workflow {
    let double = Step::function("double", number_schema(), number_schema(), |input, _ctx| async move {
        Ok(json!(input.as_i64().unwrap_or(0) * 2))
    });
    WorkflowBuilder::new("math", number_schema()).pipe_prev(double).done(number_schema())
}

fn approval_workflow() -> Workflow {
    let compute = Step::function("compute", number_schema(), number_schema(), |input, _ctx| async move {
        Ok(json!(input.as_i64().unwrap_or(0) * 2))
    });
    let approval = Step::checkpoint(
        "approval",
        number_schema(),
        json!({"type": "object", "required": ["approved"]}),
        |input| format!("approve result {}?", input),
    );
    let finalize = Step::function("finalize", any_schema(), number_schema(), |input, _ctx| async move {
        let approved = input.get("approved").and_then(|v| v.as_bool()).unwrap_or(false);
        Ok(json!(if approved { 1 } else { 0 }))
    });
    WorkflowBuilder::new("approval-flow", number_schema())
        .pipe_prev(compute)
        .pipe_prev(approval)
        .pipe_prev(finalize)
        .done(number_schema())
}

fn sleep_workflow() -> Workflow {
    let sleepy = Step::shell(
        "sleepy",
        any_schema(),
        any_schema(),
        |_| "sleep 30".to_string(),
        |_stdout, _exit| Ok(json!(null)),
    );
    WorkflowBuilder::new("sleeper", any_schema()).pipe_prev(sleepy).done(any_schema())
}

fn router_with(workflows: Vec<Workflow>) -> TestRouter {
    let mut registry = WorkflowRegistry::new();
    for workflow in workflows {
        registry = registry.register(workflow);
    }
    Router::new(registry, SystemShell, ScriptedAgent::new(), None, std::env::temp_dir())
}

async fn wait_for_status(router: &TestRouter, run_id: &RunId, status: RunStatus) -> RunState {
    for _ in 0..500 {
        if let Some(state) = router.store().get(run_id.as_str()) {
            if state.status == status {
                return state;
            }
            assert!(
                !state.status.is_terminal() || state.status == status,
                "run settled at {} while waiting for {}",
                state.status,
                status
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run never reached {}", status);
}

async fn wait_for_pending_checkpoint(router: &TestRouter, run_id: &RunId) -> rb_core::CheckpointInfo {
    for _ in 0..500 {
        if let Some(state) = router.store().get(run_id.as_str()) {
            if let Some(info) = state.pending_checkpoints.first() {
                return info.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run never suspended on a checkpoint");
}

#[tokio::test]
async fn submitted_run_completes_and_records_output() {
    let router = router_with(vec![math_workflow()]);
    let run_id = router.submit("math", json!(21)).unwrap();

    let state = wait_for_status(&router, &run_id, RunStatus::Success).await;
    assert_eq!(state.output, Some(json!(42)));
    assert!(state.completed_at_ms.is_some());
    assert!(state.error.is_none());
    // Trace mirrored into the store as events landed.
    assert_eq!(state.trace_events.first().map(|e| e.kind()), Some("workflow:start"));
    assert_eq!(state.trace_events.last().map(|e| e.kind()), Some("workflow:complete"));
}

#[test]
fn unknown_workflow_is_rejected() {
    let router = router_with(vec![]);
    assert!(matches!(
        router.submit("ghost", json!(1)),
        Err(RouterError::UnknownWorkflow(_))
    ));
}

#[test]
fn invalid_input_is_rejected_without_creating_a_run() {
    let router = router_with(vec![math_workflow()]);
    assert!(matches!(
        router.submit("math", json!("not a number")),
        Err(RouterError::InvalidInput { .. })
    ));
    assert!(router.store().is_empty());
}

#[tokio::test]
async fn checkpoint_flow_suspends_resolves_and_clears_pending() {
    let router = router_with(vec![approval_workflow()]);
    let run_id = router.submit("approval-flow", json!(21)).unwrap();

    let info = wait_for_pending_checkpoint(&router, &run_id).await;
    assert_eq!(info.step_id, "approval");
    assert!(info.prompt.contains("42"));

    // A value failing the stored schema is rejected and leaves the run
    // suspended.
    let err = router
        .resolve_checkpoint(run_id.as_str(), info.checkpoint_id.as_str(), json!("yes"))
        .unwrap_err();
    assert!(matches!(err, RouterError::InvalidCheckpointValue { .. }));

    router
        .resolve_checkpoint(run_id.as_str(), info.checkpoint_id.as_str(), json!({"approved": true}))
        .unwrap();
    let state = wait_for_status(&router, &run_id, RunStatus::Success).await;
    assert_eq!(state.output, Some(json!(1)));
    assert!(state.pending_checkpoints.is_empty());
}

#[tokio::test]
async fn checkpoint_of_another_run_is_not_resolvable() {
    let router = router_with(vec![approval_workflow(), math_workflow()]);
    let suspended = router.submit("approval-flow", json!(1)).unwrap();
    let other = router.submit("math", json!(1)).unwrap();
    let info = wait_for_pending_checkpoint(&router, &suspended).await;

    let err = router
        .resolve_checkpoint(other.as_str(), info.checkpoint_id.as_str(), json!({"approved": true}))
        .unwrap_err();
    assert!(matches!(err, RouterError::UnknownCheckpoint(_)));
}

#[tokio::test]
async fn cancelled_run_settles_as_cancelled_not_failure() {
    let router = router_with(vec![sleep_workflow()]);
    let run_id = router.submit("sleeper", json!(null)).unwrap();

    // Let the shell step actually start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    router.cancel(run_id.as_str()).unwrap();

    let state = wait_for_status(&router, &run_id, RunStatus::Cancelled).await;
    assert_eq!(state.status, RunStatus::Cancelled);
    assert!(state.pending_checkpoints.is_empty());
}

#[tokio::test]
async fn cancel_is_idempotent_only_before_terminal() {
    let router = router_with(vec![math_workflow()]);
    let run_id = router.submit("math", json!(1)).unwrap();
    wait_for_status(&router, &run_id, RunStatus::Success).await;

    assert!(matches!(
        router.cancel(run_id.as_str()),
        Err(RouterError::AlreadyTerminal(_))
    ));
}

#[tokio::test]
async fn resume_replays_the_prefix_and_waits_for_a_fresh_checkpoint() {
    let router = router_with(vec![approval_workflow()]);
    let first = router.submit("approval-flow", json!(21)).unwrap();
    let info = wait_for_pending_checkpoint(&router, &first).await;

    // Abandon the first run at its checkpoint and resume into a new one.
    let (second, resumed_from) = router.resume("approval-flow", first.as_str()).unwrap();
    assert_eq!(resumed_from, first);
    assert_ne!(second, first);

    let second_info = wait_for_pending_checkpoint(&router, &second).await;
    assert_ne!(second_info.checkpoint_id, info.checkpoint_id, "checkpoint must be fresh");

    router
        .resolve_checkpoint(second.as_str(), second_info.checkpoint_id.as_str(), json!({"approved": true}))
        .unwrap();
    let state = wait_for_status(&router, &second, RunStatus::Success).await;
    assert_eq!(state.output, Some(json!(1)));

    // The resumed run replayed `compute` instead of re-running it.
    let skipped: Vec<&str> = state
        .trace_events
        .iter()
        .filter_map(|event| match event {
            TraceEvent::StepSkipped { step_id, .. } => Some(step_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec!["compute"]);
}

#[tokio::test]
async fn resume_without_checkpoint_is_refused() {
    let router = router_with(vec![math_workflow()]);
    let run_id = router.submit("math", json!(1)).unwrap();
    wait_for_status(&router, &run_id, RunStatus::Success).await;

    assert!(matches!(
        router.resume("math", run_id.as_str()),
        Err(RouterError::NoCheckpointFound(_))
    ));
}

#[tokio::test]
async fn terminal_artifacts_land_in_the_git_store() {
    let repo = tempfile::tempdir().unwrap();
    let status = std::process::Command::new("git")
        .args(["init", "--quiet"])
        .current_dir(repo.path())
        .status()
        .unwrap();
    assert!(status.success());

    let registry = WorkflowRegistry::new().register(math_workflow());
    let router: TestRouter = Router::new(
        registry,
        SystemShell,
        ScriptedAgent::new(),
        Some(rb_storage::GitStore::new(repo.path().to_path_buf())),
        std::env::temp_dir(),
    );

    let run_id = router.submit("math", json!(2)).unwrap();
    wait_for_status(&router, &run_id, RunStatus::Success).await;

    // The artifact write is asynchronous; poll for it.
    let artifacts = router.artifacts().unwrap().clone();
    for _ in 0..500 {
        if let Ok(trace) = artifacts.get_trace(run_id.as_str()).await {
            assert_eq!(trace.run_id, run_id);
            assert_eq!(trace.status, TraceStatus::Success);
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("artifacts never appeared");
}

#[test]
fn snapshot_from_trace_collects_the_completed_prefix() {
    let mut state = RunState::new(RunId::new("run-1"), "wf", json!(5), 0);
    state.trace_events = vec![
        TraceEvent::StepComplete { ts: 1, step_id: "compute".into(), output: json!(10), duration_ms: 1 },
        TraceEvent::CheckpointWaiting { ts: 2, step_id: "approval".into(), prompt: "ok?".into() },
        TraceEvent::StepComplete { ts: 3, step_id: "late".into(), output: json!(0), duration_ms: 1 },
    ];

    let snapshot = snapshot_from_trace(&state).unwrap();
    assert_eq!(snapshot.resume_at, "approval");
    assert_eq!(snapshot.completed_steps.len(), 1);
    assert_eq!(snapshot.completed_steps.get("compute"), Some(&json!(10)));
    assert_eq!(snapshot.trace_events.len(), 1);
}

#[test]
fn snapshot_requires_a_checkpoint_event() {
    let state = RunState::new(RunId::new("run-1"), "wf", json!(5), 0);
    assert!(snapshot_from_trace(&state).is_none());
}
