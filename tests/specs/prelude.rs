// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for scenario specs.

use rb_adapters::{ScriptedAgent, ScriptedCheckpoint, SystemShell};
use rb_core::{RunId, RunState, RunStatus, Step, Workflow};
use rb_daemon::{Router, WorkflowRegistry};
use rb_engine::{Engine, WorkflowBuilder};
use serde_json::json;
use std::time::Duration;

pub use serde_json::Value;

pub type SpecEngine = Engine<SystemShell, ScriptedAgent, ScriptedCheckpoint>;
pub type SpecRouter = Router<SystemShell, ScriptedAgent>;

pub fn number_schema() -> Value {
    json!({"type": "number"})
}

pub fn string_schema() -> Value {
    json!({"type": "string"})
}

pub fn any_schema() -> Value {
    json!(true)
}

pub fn engine_with(agent: ScriptedAgent, checkpoint: ScriptedCheckpoint) -> SpecEngine {
    Engine::new(SystemShell, agent, checkpoint, std::env::temp_dir())
}

pub fn engine() -> SpecEngine {
    engine_with(ScriptedAgent::new(), ScriptedCheckpoint::new())
}

pub fn router_with(workflows: Vec<Workflow>, agent: ScriptedAgent) -> SpecRouter {
    let mut registry = WorkflowRegistry::new();
    for workflow in workflows {
        registry = registry.register(workflow);
    }
    Router::new(registry, SystemShell, agent, None, std::env::temp_dir())
}

pub fn double_step() -> Step {
    Step::function("double", number_schema(), number_schema(), |input, _ctx| async move {
        Ok(json!(input.as_i64().unwrap_or(0) * 2))
    })
}

pub fn add_ten_step() -> Step {
    Step::function("add_ten", number_schema(), number_schema(), |input, _ctx| async move {
        Ok(json!(input.as_i64().unwrap_or(0) + 10))
    })
}

pub fn to_string_step() -> Step {
    Step::function("to_string", number_schema(), string_schema(), |input, _ctx| async move {
        Ok(json!(format!("result: {}", input.as_i64().unwrap_or(0))))
    })
}

/// compute (n → 2n) → approval (checkpoint) → finalize (approved → 1).
pub fn approval_workflow() -> Workflow {
    let compute = Step::function("compute", number_schema(), number_schema(), |input, _ctx| async move {
        Ok(json!(input.as_i64().unwrap_or(0) * 2))
    });
    let approval = Step::checkpoint(
        "approval",
        number_schema(),
        json!({"type": "object", "properties": {"approved": {"type": "boolean"}}, "required": ["approved"]}),
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

/// Maximum time a spec waits for an async condition.
pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(10);

pub async fn wait_for_status(router: &SpecRouter, run_id: &RunId, status: RunStatus) -> RunState {
    let deadline = tokio::time::Instant::now() + SPEC_WAIT_MAX;
    loop {
        if let Some(state) = router.store().get(run_id.as_str()) {
            if state.status == status {
                return state;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "run {run_id} never reached {status}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_pending_checkpoint(
    router: &SpecRouter,
    run_id: &RunId,
) -> rb_core::CheckpointInfo {
    let deadline = tokio::time::Instant::now() + SPEC_WAIT_MAX;
    loop {
        if let Some(state) = router.store().get(run_id.as_str()) {
            if let Some(info) = state.pending_checkpoints.first() {
                return info.clone();
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "run {run_id} never suspended on a checkpoint"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
