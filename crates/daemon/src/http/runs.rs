// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run inspection, cancellation, checkpoint resolution, and history.

use super::error::ApiError;
use crate::router::Router;
use axum::extract::{Path, Query, State};
use axum::Json;
use rb_adapters::{AgentExecutor, ShellProvider};
use rb_core::{CheckpointId, RunId, RunState, RunStatus, Trace, TraceStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Serialized run with `pending_checkpoints` reduced to an array of ids.
#[derive(Debug, Serialize)]
pub(super) struct RunView {
    run_id: RunId,
    workflow_id: String,
    status: RunStatus,
    input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    started_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at_ms: Option<u64>,
    pending_checkpoints: Vec<CheckpointId>,
    event_count: usize,
}

impl From<RunState> for RunView {
    fn from(state: RunState) -> Self {
        Self {
            run_id: state.run_id,
            workflow_id: state.workflow_id,
            status: state.status,
            input: state.input,
            output: state.output,
            error: state.error,
            started_at_ms: state.started_at_ms,
            completed_at_ms: state.completed_at_ms,
            pending_checkpoints: state
                .pending_checkpoints
                .into_iter()
                .map(|info| info.checkpoint_id)
                .collect(),
            event_count: state.trace_events.len(),
        }
    }
}

/// GET /runs: all runs, newest first.
pub(super) async fn list<Sh, Ag>(State(router): State<Router<Sh, Ag>>) -> Json<Value>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    let mut runs = router.store().list();
    runs.sort_by(|a, b| b.started_at_ms.cmp(&a.started_at_ms));
    let views: Vec<RunView> = runs.into_iter().map(RunView::from).collect();
    Json(json!({"runs": views}))
}

/// GET /runs/:id
pub(super) async fn get_run<Sh, Ag>(
    State(router): State<Router<Sh, Ag>>,
    Path(id): Path<String>,
) -> Result<Json<RunView>, ApiError>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    let state = router
        .store()
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown run: {}", id)))?;
    Ok(Json(RunView::from(state)))
}

/// GET /runs/:id/trace
pub(super) async fn get_trace<Sh, Ag>(
    State(router): State<Router<Sh, Ag>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    let state = router
        .store()
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown run: {}", id)))?;
    let status = if state.status == RunStatus::Success {
        TraceStatus::Success
    } else {
        TraceStatus::Failure
    };
    let duration_ms = state
        .completed_at_ms
        .map(|end| end.saturating_sub(state.started_at_ms))
        .unwrap_or(0);
    let trace = Trace {
        run_id: state.run_id,
        workflow_id: state.workflow_id,
        events: state.trace_events,
        status,
        duration_ms,
    };
    Ok(Json(json!({"trace": trace})))
}

/// POST /runs/:id/cancel → {status:"cancelled"}
pub(super) async fn cancel<Sh, Ag>(
    State(router): State<Router<Sh, Ag>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    let run_id = router.cancel(&id)?;
    Ok(Json(json!({"status": "cancelled", "run_id": run_id})))
}

#[derive(Debug, Deserialize)]
pub(super) struct ResolveBody {
    value: Value,
}

/// POST /runs/:id/checkpoints/:checkpoint_id
pub(super) async fn resolve_checkpoint<Sh, Ag>(
    State(router): State<Router<Sh, Ag>>,
    Path((run_id, checkpoint_id)): Path<(String, String)>,
    Json(body): Json<ResolveBody>,
) -> Result<Json<Value>, ApiError>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    let run_id = router.resolve_checkpoint(&run_id, &checkpoint_id, body.value)?;
    Ok(Json(json!({"status": "resolved", "run_id": run_id})))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct HistoryQuery {
    workflow_id: Option<String>,
    limit: Option<usize>,
}

/// GET /runs/history: persisted runs from the artifact store.
pub(super) async fn history<Sh, Ag>(
    State(router): State<Router<Sh, Ag>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    let filter = rb_storage::ListFilter { workflow_id: query.workflow_id, limit: query.limit };
    let runs = router
        .history(&filter)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({"runs": runs, "source": "git"})))
}
