// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow router.
//!
//! Stateless except through the run store: a submission validates input,
//! registers a pending run, then spawns the engine on the ambient
//! runtime. Trace events mirror into the store as they land; checkpoint
//! waits and terminal states trigger best-effort artifact writes that
//! never affect the engine's result.

use crate::checkpoints::RegistryCheckpoint;
use indexmap::IndexMap;
use rb_adapters::{AgentExecutor, CheckpointError, CheckpointRegistry, ShellProvider};
use rb_core::{
    issues_summary, validate_schema, Clock, RunId, RunOutcome, RunPatch, RunSnapshot, RunState,
    RunStatus, SchemaIssue, SystemClock, TraceEvent, TraceStatus, Workflow, WorkflowSummary,
};
use rb_engine::{Engine, RunOpts};
use rb_storage::{GitStore, RunStore, StorableRun};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("unknown workflow: {0}")]
    UnknownWorkflow(String),
    #[error("unknown run: {0}")]
    UnknownRun(String),
    #[error("unknown checkpoint: {0}")]
    UnknownCheckpoint(String),
    #[error("invalid input: {}", issues_summary(.issues))]
    InvalidInput { issues: Vec<SchemaIssue> },
    #[error("checkpoint value rejected: {}", issues_summary(.issues))]
    InvalidCheckpointValue { issues: Vec<SchemaIssue> },
    #[error("run {0} is already terminal")]
    AlreadyTerminal(String),
    #[error("no checkpoint to resume from in run {0}")]
    NoCheckpointFound(String),
}

/// Workflows the server can run, keyed by id in registration order.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: IndexMap<String, Arc<Workflow>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, workflow: Workflow) -> Self {
        self.workflows.insert(workflow.id.clone(), Arc::new(workflow));
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<Workflow>> {
        self.workflows.get(id).cloned()
    }

    pub fn summaries(&self) -> Vec<WorkflowSummary> {
        self.workflows.values().map(|w| w.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

/// Accepts submissions and drives engine invocations asynchronously.
pub struct Router<Sh, Ag> {
    workflows: Arc<WorkflowRegistry>,
    store: RunStore,
    registry: CheckpointRegistry,
    shell: Sh,
    agent: Ag,
    artifacts: Option<Arc<GitStore>>,
    working_dir: PathBuf,
    clock: SystemClock,
}

impl<Sh: Clone, Ag: Clone> Clone for Router<Sh, Ag> {
    fn clone(&self) -> Self {
        Self {
            workflows: Arc::clone(&self.workflows),
            store: self.store.clone(),
            registry: self.registry.clone(),
            shell: self.shell.clone(),
            agent: self.agent.clone(),
            artifacts: self.artifacts.clone(),
            working_dir: self.working_dir.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<Sh, Ag> Router<Sh, Ag>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    pub fn new(
        workflows: WorkflowRegistry,
        shell: Sh,
        agent: Ag,
        artifacts: Option<GitStore>,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            workflows: Arc::new(workflows),
            store: RunStore::new(),
            registry: CheckpointRegistry::new(),
            shell,
            agent,
            artifacts: artifacts.map(Arc::new),
            working_dir,
            clock: SystemClock,
        }
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn agent(&self) -> &Ag {
        &self.agent
    }

    pub fn workflows(&self) -> &WorkflowRegistry {
        &self.workflows
    }

    pub fn artifacts(&self) -> Option<&Arc<GitStore>> {
        self.artifacts.as_ref()
    }

    /// Validate and accept a run; the engine is spawned asynchronously.
    pub fn submit(&self, workflow_id: &str, input: Value) -> Result<RunId, RouterError> {
        let workflow = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| RouterError::UnknownWorkflow(workflow_id.to_string()))?;
        if let Err(issues) = validate_schema(&workflow.input_schema, &input) {
            return Err(RouterError::InvalidInput { issues });
        }

        let run_id = RunId::generate();
        let state =
            RunState::new(run_id.clone(), &workflow.id, input.clone(), self.clock.epoch_ms());
        let cancel = self.store.create(state);
        tracing::info!(run_id = %run_id, workflow_id = %workflow.id, "run accepted");

        let router = self.clone();
        let task_run_id = run_id.clone();
        tokio::spawn(async move {
            router.execute_run(workflow, task_run_id, input, cancel, None).await;
        });
        Ok(run_id)
    }

    /// Cancel an in-flight run. Records `cancelled` before firing the
    /// token so the terminal write can tell cancellation from failure.
    pub fn cancel(&self, id_or_prefix: &str) -> Result<RunId, RouterError> {
        let state = self
            .store
            .get(id_or_prefix)
            .ok_or_else(|| RouterError::UnknownRun(id_or_prefix.to_string()))?;
        if state.status.is_terminal() {
            return Err(RouterError::AlreadyTerminal(state.run_id.as_str().to_string()));
        }
        let run_id = state.run_id;
        if let Err(e) = self.store.update(&run_id, RunPatch::status(RunStatus::Cancelled)) {
            tracing::warn!(run_id = %run_id, error = %e, "cancel status write failed");
        }
        if let Some(token) = self.store.cancel_token(&run_id) {
            token.cancel();
        }
        tracing::info!(run_id = %run_id, "run cancelled");
        Ok(run_id)
    }

    /// Resolve a pending checkpoint with an externally supplied value.
    pub fn resolve_checkpoint(
        &self,
        run_prefix: &str,
        checkpoint_prefix: &str,
        value: Value,
    ) -> Result<RunId, RouterError> {
        let state = self
            .store
            .get(run_prefix)
            .ok_or_else(|| RouterError::UnknownRun(run_prefix.to_string()))?;
        let run_id = state.run_id.clone();

        let checkpoint_id = self
            .registry
            .resolve_id(checkpoint_prefix)
            .ok_or_else(|| RouterError::UnknownCheckpoint(checkpoint_prefix.to_string()))?;
        let belongs_to_run = self
            .registry
            .pending_for_run(&run_id)
            .iter()
            .any(|info| info.checkpoint_id == checkpoint_id);
        if !belongs_to_run {
            return Err(RouterError::UnknownCheckpoint(checkpoint_prefix.to_string()));
        }

        match self.registry.resolve(checkpoint_id.as_str(), value) {
            Ok(info) => {
                tracing::info!(
                    run_id = %run_id,
                    checkpoint_id = %info.checkpoint_id,
                    step_id = %info.step_id,
                    "checkpoint resolved"
                );
                Ok(run_id)
            }
            Err(CheckpointError::Invalid { issues }) => {
                Err(RouterError::InvalidCheckpointValue { issues })
            }
            Err(_) => Err(RouterError::UnknownCheckpoint(checkpoint_prefix.to_string())),
        }
    }

    /// Build a snapshot from the source run's trace (everything completed
    /// before its last `checkpoint:waiting`) and start a fresh run from it.
    pub fn resume(
        &self,
        workflow_id: &str,
        run_prefix: &str,
    ) -> Result<(RunId, RunId), RouterError> {
        let workflow = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| RouterError::UnknownWorkflow(workflow_id.to_string()))?;
        let source = self
            .store
            .get(run_prefix)
            .ok_or_else(|| RouterError::UnknownRun(run_prefix.to_string()))?;

        let snapshot = snapshot_from_trace(&source)
            .ok_or_else(|| RouterError::NoCheckpointFound(source.run_id.as_str().to_string()))?;

        let run_id = RunId::generate();
        let state = RunState::new(
            run_id.clone(),
            &workflow.id,
            source.input.clone(),
            self.clock.epoch_ms(),
        );
        let cancel = self.store.create(state);
        tracing::info!(
            run_id = %run_id,
            resumed_from = %source.run_id,
            resume_at = %snapshot.resume_at,
            "resume accepted"
        );

        let router = self.clone();
        let input = source.input.clone();
        let task_run_id = run_id.clone();
        tokio::spawn(async move {
            router.execute_run(workflow, task_run_id, input, cancel, Some(snapshot)).await;
        });
        Ok((run_id, source.run_id))
    }

    /// One engine invocation plus its terminal bookkeeping.
    async fn execute_run(
        &self,
        workflow: Arc<Workflow>,
        run_id: RunId,
        input: Value,
        cancel: CancellationToken,
        snapshot: Option<RunSnapshot>,
    ) {
        if let Err(e) = self.store.update(&run_id, RunPatch::status(RunStatus::Running)) {
            tracing::warn!(run_id = %run_id, error = %e, "running status write failed");
        }

        let engine = Engine::new(
            self.shell.clone(),
            self.agent.clone(),
            RegistryCheckpoint::new(self.registry.clone(), self.store.clone(), run_id.clone()),
            self.working_dir.clone(),
        );

        let on_trace = {
            let router = self.clone();
            let run_id = run_id.clone();
            Arc::new(move |event: &TraceEvent| {
                if let Err(e) = router.store.append_events(&run_id, std::slice::from_ref(event)) {
                    tracing::warn!(run_id = %run_id, error = %e, "trace mirror failed");
                }
                // Persist artifacts at every suspension so the pending run
                // can be inspected offline before resolution.
                if matches!(event, TraceEvent::CheckpointWaiting { .. }) {
                    router.write_artifacts(&run_id);
                }
            })
        };

        let result = engine
            .run(
                &workflow,
                input,
                RunOpts {
                    run_id: Some(run_id.clone()),
                    cancel: Some(cancel),
                    on_trace: Some(on_trace),
                    snapshot,
                },
            )
            .await;

        let completed_at_ms = self.clock.epoch_ms();
        let patch = match &result {
            Ok(RunOutcome { output, .. }) => RunPatch {
                status: Some(RunStatus::Success),
                output: Some(output.clone()),
                completed_at_ms: Some(completed_at_ms),
                pending_checkpoints: Some(Vec::new()),
                ..RunPatch::default()
            },
            Err(error) => {
                // An explicit cancel request already wrote `cancelled`; an
                // aborted step without one also counts as cancellation.
                let already_cancelled = self
                    .store
                    .get(run_id.as_str())
                    .map(|s| s.status == RunStatus::Cancelled)
                    .unwrap_or(false);
                let status = if already_cancelled || error.is_aborted() {
                    RunStatus::Cancelled
                } else {
                    RunStatus::Failure
                };
                RunPatch {
                    status: Some(status),
                    error: Some(error.to_string()),
                    completed_at_ms: Some(completed_at_ms),
                    pending_checkpoints: Some(Vec::new()),
                    ..RunPatch::default()
                }
            }
        };

        let drained = self.registry.drain_run(&run_id, "run reached a terminal state");
        if !drained.is_empty() {
            tracing::info!(run_id = %run_id, count = drained.len(), "rejected dangling checkpoints");
        }
        if let Err(e) = self.store.finish(&run_id, patch) {
            tracing::warn!(run_id = %run_id, error = %e, "terminal state write failed");
        }
        match &result {
            Ok(outcome) => {
                tracing::info!(run_id = %run_id, duration_ms = outcome.duration_ms, "run succeeded")
            }
            Err(error) => tracing::warn!(run_id = %run_id, error = %error, "run ended with error"),
        }
        self.write_artifacts(&run_id);
    }

    /// History listing from the artifact store.
    pub async fn history(
        &self,
        filter: &rb_storage::ListFilter,
    ) -> Result<Vec<rb_storage::StoredRunSummary>, rb_storage::GitStoreError> {
        match &self.artifacts {
            Some(artifacts) => artifacts.list(filter).await,
            None => Ok(Vec::new()),
        }
    }

    /// Fire-and-forget artifact write from the current run state.
    /// Failures are logged and suppressed; the engine never depends on
    /// this store.
    fn write_artifacts(&self, run_id: &RunId) {
        let Some(artifacts) = self.artifacts.clone() else {
            return;
        };
        let Some(state) = self.store.get(run_id.as_str()) else {
            return;
        };
        let now_ms = self.clock.epoch_ms();
        tokio::spawn(async move {
            let storable = storable_from_state(&state, now_ms);
            if let Err(e) = artifacts.store(&storable).await {
                tracing::warn!(run_id = %state.run_id, error = %e, "artifact write failed");
            }
        });
    }
}

/// Project a run state onto the artifact store's input shape.
fn storable_from_state(state: &RunState, now_ms: u64) -> StorableRun {
    let duration_ms =
        state.completed_at_ms.unwrap_or(now_ms).saturating_sub(state.started_at_ms);
    let status = if state.status == RunStatus::Success {
        TraceStatus::Success
    } else {
        TraceStatus::Failure
    };
    StorableRun {
        run_id: state.run_id.clone(),
        workflow_id: state.workflow_id.clone(),
        input: state.input.clone(),
        output: state.output.clone(),
        duration_ms,
        started_at_ms: state.started_at_ms,
        trace: rb_core::Trace {
            run_id: state.run_id.clone(),
            workflow_id: state.workflow_id.clone(),
            events: state.trace_events.clone(),
            status,
            duration_ms,
        },
        steps: None,
    }
}

/// Derive a resume snapshot from a run's trace: outputs of every
/// `step:complete` preceding the last `checkpoint:waiting`, resuming at
/// the checkpoint's step.
fn snapshot_from_trace(state: &RunState) -> Option<RunSnapshot> {
    let (waiting_index, resume_at) =
        state.trace_events.iter().enumerate().rev().find_map(|(index, event)| match event {
            TraceEvent::CheckpointWaiting { step_id, .. } => Some((index, step_id.clone())),
            _ => None,
        })?;

    let mut completed_steps = indexmap::IndexMap::new();
    for event in &state.trace_events[..waiting_index] {
        if let TraceEvent::StepComplete { step_id, output, .. } = event {
            completed_steps.insert(step_id.clone(), output.clone());
        }
    }

    Some(RunSnapshot {
        run_id: state.run_id.clone(),
        workflow_id: state.workflow_id.clone(),
        input: state.input.clone(),
        completed_steps,
        resume_at,
        trace_events: state.trace_events[..waiting_index].to_vec(),
    })
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
