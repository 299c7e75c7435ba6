// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for tests across the workspace.
#![cfg_attr(coverage_nightly, coverage(off))]
#![allow(clippy::unwrap_used)]

use crate::context::{StepContext, SubWorkflowRunner, TraceSink};
use crate::error::WorkflowError;
use crate::id::RunId;
use crate::run::RunOutcome;
use crate::workflow::Workflow;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// `{"type": "number"}`
pub fn number_schema() -> Value {
    json!({"type": "number"})
}

/// `{"type": "string"}`
pub fn string_schema() -> Value {
    json!({"type": "string"})
}

/// Accepts anything.
pub fn any_schema() -> Value {
    json!(true)
}

/// Sub-workflow runner that fails every invocation; for contexts in tests
/// that never compose workflows.
#[derive(Clone, Default)]
pub struct NoSubWorkflows;

#[async_trait]
impl SubWorkflowRunner for NoSubWorkflows {
    async fn run_workflow(
        &self,
        workflow: Arc<Workflow>,
        _input: Value,
    ) -> Result<RunOutcome, WorkflowError> {
        Err(WorkflowError::config(format!(
            "sub-workflow `{}` invoked without an engine",
            workflow.id
        )))
    }
}

/// Minimal step context for exercising `Fn` bodies directly.
pub fn step_context(step_id: &str) -> StepContext {
    StepContext {
        workflow_id: "test-workflow".to_string(),
        step_id: step_id.to_string(),
        run_id: RunId::new("run-test"),
        trace: TraceSink::null(),
        cancel: CancellationToken::new(),
        engine: Arc::new(NoSubWorkflows),
        working_dir: PathBuf::from("."),
    }
}
