// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-step execution context.
//!
//! `Fn` step bodies receive a `StepContext` so they can emit trace events,
//! observe cancellation, and invoke sub-workflows without depending on the
//! engine crate directly.

use crate::error::WorkflowError;
use crate::id::RunId;
use crate::run::RunOutcome;
use crate::trace::TraceEvent;
use crate::workflow::Workflow;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cloneable handle that appends events to the run's trace collector.
#[derive(Clone)]
pub struct TraceSink {
    emit: Arc<dyn Fn(TraceEvent) + Send + Sync>,
}

impl TraceSink {
    pub fn new<F>(emit: F) -> Self
    where
        F: Fn(TraceEvent) + Send + Sync + 'static,
    {
        Self { emit: Arc::new(emit) }
    }

    /// Sink that drops every event; for contexts built outside a run.
    pub fn null() -> Self {
        Self { emit: Arc::new(|_| {}) }
    }

    pub fn emit(&self, event: TraceEvent) {
        (self.emit)(event)
    }
}

impl std::fmt::Debug for TraceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TraceSink")
    }
}

/// Engine capability exposed to step bodies: run a child workflow with the
/// parent's providers, cancellation signal, and working directory. The
/// child gets a fresh run id and its own trace.
#[async_trait]
pub trait SubWorkflowRunner: Send + Sync {
    async fn run_workflow(
        &self,
        workflow: Arc<Workflow>,
        input: Value,
    ) -> Result<RunOutcome, WorkflowError>;
}

/// Context handed to an `Fn` step body.
#[derive(Clone)]
pub struct StepContext {
    pub workflow_id: String,
    pub step_id: String,
    pub run_id: RunId,
    pub trace: TraceSink,
    /// Cancellation signal for this run (or this parallel branch).
    pub cancel: CancellationToken,
    pub engine: Arc<dyn SubWorkflowRunner>,
    pub working_dir: PathBuf,
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("workflow_id", &self.workflow_id)
            .field("step_id", &self.step_id)
            .field("run_id", &self.run_id)
            .field("working_dir", &self.working_dir)
            .finish()
    }
}
