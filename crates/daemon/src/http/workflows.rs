// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow listing, submission, and resume handlers.

use super::error::ApiError;
use crate::router::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rb_adapters::{AgentExecutor, ShellProvider};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub(super) struct RunBody {
    input: Value,
}

/// GET /workflows
pub(super) async fn list<Sh, Ag>(State(router): State<Router<Sh, Ag>>) -> Json<Value>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    Json(json!({"workflows": router.workflows().summaries()}))
}

/// POST /workflows/:id/run → 202 {run_id}
pub(super) async fn submit<Sh, Ag>(
    State(router): State<Router<Sh, Ag>>,
    Path(workflow_id): Path<String>,
    Json(body): Json<RunBody>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    let run_id = router.submit(&workflow_id, body.input)?;
    Ok((StatusCode::ACCEPTED, Json(json!({"run_id": run_id}))))
}

/// POST /workflows/:id/resume/:run_id → 202 {run_id, resumed_from}
pub(super) async fn resume<Sh, Ag>(
    State(router): State<Router<Sh, Ag>>,
    Path((workflow_id, run_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    let (run_id, resumed_from) = router.resume(&workflow_id, &run_id)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({"run_id": run_id, "resumed_from": resumed_from})),
    ))
}
