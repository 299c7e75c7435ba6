// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution engine.
//!
//! `Engine::run` executes one workflow invocation: boundary validation,
//! node scheduling in declaration order, provider dispatch per step kind,
//! snapshot replay, and trace emission. Parallel nodes fan out on the
//! ambient runtime; everything else is sequential within the run.

use crate::agent_step::{self, AgentDispatch};
use crate::collector::{TraceCollector, TraceListener};
use async_trait::async_trait;
use futures_util::future::join_all;
use rb_adapters::{
    AgentExecutor, CheckpointError, CheckpointProvider, ShellError, ShellOpts, ShellProvider,
};
use rb_core::{
    validate_schema, Clock, Mapper, RunId, RunOutcome, RunSnapshot, Step, StepContext, StepError,
    StepKind, StepNode, SubWorkflowRunner, SystemClock, TraceEvent, TraceStatus, Workflow,
    WorkflowError,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const REPLAY_REASON: &str = "replayed from snapshot";

/// Options for one engine invocation.
#[derive(Default)]
pub struct RunOpts {
    /// Generated when absent.
    pub run_id: Option<RunId>,
    pub cancel: Option<CancellationToken>,
    /// Listener registered on the collector before the first event.
    pub on_trace: Option<TraceListener>,
    /// Replay summary; completed steps are skipped.
    pub snapshot: Option<RunSnapshot>,
}

/// Workflow execution engine, generic over its three provider seams.
#[derive(Clone)]
pub struct Engine<Sh, Ag, Cp, C = SystemClock> {
    shell: Sh,
    agent: Ag,
    checkpoint: Cp,
    clock: C,
    working_dir: PathBuf,
}

impl<Sh, Ag, Cp> Engine<Sh, Ag, Cp, SystemClock>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
    Cp: CheckpointProvider,
{
    pub fn new(shell: Sh, agent: Ag, checkpoint: Cp, working_dir: PathBuf) -> Self {
        Self { shell, agent, checkpoint, clock: SystemClock, working_dir }
    }
}

impl<Sh, Ag, Cp, C> Engine<Sh, Ag, Cp, C>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
    Cp: CheckpointProvider,
    C: Clock,
{
    pub fn with_clock(shell: Sh, agent: Ag, checkpoint: Cp, working_dir: PathBuf, clock: C) -> Self {
        Self { shell, agent, checkpoint, clock, working_dir }
    }

    pub fn agent(&self) -> &Ag {
        &self.agent
    }

    fn ts(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// Execute `workflow` against `input`.
    ///
    /// Emits `workflow:start` first and exactly one of `workflow:complete`
    /// / `workflow:error` last; step events land in between per the
    /// scheduling order.
    pub async fn run(
        &self,
        workflow: &Workflow,
        input: Value,
        opts: RunOpts,
    ) -> Result<RunOutcome, WorkflowError> {
        let RunOpts { run_id, cancel, on_trace, snapshot } = opts;
        let run_id = run_id.unwrap_or_else(RunId::generate);
        let cancel = cancel.unwrap_or_default();
        let collector = TraceCollector::new(run_id.clone(), workflow.id.clone());
        if let Some(listener) = on_trace {
            collector.on_event(listener);
        }
        let started_ms = self.clock.epoch_ms();

        tracing::info!(run_id = %run_id, workflow_id = %workflow.id, "workflow run starting");
        collector.emit(TraceEvent::WorkflowStart {
            ts: started_ms,
            run_id: run_id.clone(),
            workflow_id: workflow.id.clone(),
            input: input.clone(),
        });

        if let Err(issues) = validate_schema(&workflow.input_schema, &input) {
            let error = WorkflowError::InvalidWorkflow { issues };
            self.emit_workflow_error(&collector, &error);
            return Err(error);
        }

        if let Some(snapshot) = &snapshot {
            if let Err(e) = snapshot.verify(workflow) {
                let error = WorkflowError::config(format!("inconsistent snapshot: {}", e));
                self.emit_workflow_error(&collector, &error);
                return Err(error);
            }
            tracing::info!(
                run_id = %run_id,
                resume_at = %snapshot.resume_at,
                replayed = snapshot.completed_steps.len(),
                "resuming from snapshot"
            );
        }

        let mut previous = input.clone();
        for node in &workflow.steps {
            if cancel.is_cancelled() {
                let step_id =
                    node.step_ids().first().map(|s| s.to_string()).unwrap_or_default();
                return Err(self.step_failure(&collector, started_ms, step_id, StepError::Aborted));
            }

            previous = match node {
                StepNode::Sequential { step, mapper } => {
                    if let Some(output) = replay_sequential(&snapshot, step) {
                        collector.emit(TraceEvent::StepSkipped {
                            ts: self.ts(),
                            step_id: step.id.clone(),
                            reason: REPLAY_REASON.to_string(),
                        });
                        output
                    } else {
                        match self
                            .execute_step(workflow, step, mapper, &input, &previous, &run_id, &collector, &cancel)
                            .await
                        {
                            Ok(output) => output,
                            Err(error) => {
                                return Err(self.step_failure(
                                    &collector,
                                    started_ms,
                                    step.id.clone(),
                                    error,
                                ));
                            }
                        }
                    }
                }
                StepNode::Parallel { branches } => {
                    if let Some(outputs) = replay_parallel(&snapshot, branches) {
                        for (step, _) in branches {
                            collector.emit(TraceEvent::StepSkipped {
                                ts: self.ts(),
                                step_id: step.id.clone(),
                                reason: REPLAY_REASON.to_string(),
                            });
                        }
                        Value::Array(outputs)
                    } else {
                        match self
                            .execute_parallel(workflow, branches, &input, &previous, &run_id, &collector, &cancel)
                            .await
                        {
                            Ok(outputs) => Value::Array(outputs),
                            Err((step_id, error)) => {
                                return Err(self.step_failure(&collector, started_ms, step_id, error));
                            }
                        }
                    }
                }
            };
        }

        if let Err(issues) = validate_schema(&workflow.output_schema, &previous) {
            let error = WorkflowError::InvalidWorkflow { issues };
            self.emit_workflow_error(&collector, &error);
            return Err(error);
        }

        let duration_ms = self.clock.epoch_ms().saturating_sub(started_ms);
        collector.emit(TraceEvent::WorkflowComplete {
            ts: self.ts(),
            output: previous.clone(),
            duration_ms,
        });
        tracing::info!(run_id = %run_id, duration_ms, "workflow run complete");
        Ok(RunOutcome {
            output: previous,
            trace: collector.snapshot(TraceStatus::Success, duration_ms),
            duration_ms,
        })
    }

    /// Execute one step: mapper, input validation, dispatch, output
    /// validation, terminal event.
    #[allow(clippy::too_many_arguments)]
    async fn execute_step(
        &self,
        workflow: &Workflow,
        step: &Step,
        mapper: &Mapper,
        workflow_input: &Value,
        previous: &Value,
        run_id: &RunId,
        collector: &TraceCollector,
        cancel: &CancellationToken,
    ) -> Result<Value, StepError> {
        let step_input = mapper(workflow_input, previous)?;
        if let Err(issues) = validate_schema(&step.input_schema, &step_input) {
            let error = StepError::ValidationError { issues };
            collector.emit(TraceEvent::StepError {
                ts: self.ts(),
                step_id: step.id.clone(),
                error: error.clone(),
                duration_ms: 0,
            });
            return Err(error);
        }

        collector.emit(TraceEvent::StepStart {
            ts: self.ts(),
            step_id: step.id.clone(),
            input: step_input.clone(),
        });
        let step_started_ms = self.clock.epoch_ms();

        let result = self
            .dispatch(workflow, step, &step_input, run_id, collector, cancel)
            .await
            .and_then(|output| match validate_schema(&step.output_schema, &output) {
                Ok(()) => Ok(output),
                Err(issues) => Err(StepError::ValidationError { issues }),
            });

        let duration_ms = self.clock.epoch_ms().saturating_sub(step_started_ms);
        match result {
            Ok(output) => {
                collector.emit(TraceEvent::StepComplete {
                    ts: self.ts(),
                    step_id: step.id.clone(),
                    output: output.clone(),
                    duration_ms,
                });
                tracing::debug!(step_id = %step.id, duration_ms, "step complete");
                Ok(output)
            }
            Err(error) => {
                collector.emit(TraceEvent::StepError {
                    ts: self.ts(),
                    step_id: step.id.clone(),
                    error: error.clone(),
                    duration_ms,
                });
                tracing::warn!(step_id = %step.id, error = %error, duration_ms, "step failed");
                Err(error)
            }
        }
    }

    /// Fan out all branches concurrently; a branch failure cancels its
    /// siblings through the shared child token. Waits for every branch to
    /// settle, then surfaces the first non-abort error in declaration
    /// order (the abort itself when nothing else failed).
    #[allow(clippy::too_many_arguments)]
    async fn execute_parallel(
        &self,
        workflow: &Workflow,
        branches: &[(Step, Mapper)],
        workflow_input: &Value,
        previous: &Value,
        run_id: &RunId,
        collector: &TraceCollector,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>, (String, StepError)> {
        let branch_cancel = cancel.child_token();
        let futures = branches.iter().map(|(step, mapper)| {
            let branch_cancel = branch_cancel.clone();
            async move {
                let result = self
                    .execute_step(workflow, step, mapper, workflow_input, previous, run_id, collector, &branch_cancel)
                    .await;
                if result.is_err() {
                    branch_cancel.cancel();
                }
                (step.id.clone(), result)
            }
        });
        let results = join_all(futures).await;

        let mut outputs = Vec::with_capacity(results.len());
        let mut first_error: Option<(String, StepError)> = None;
        let mut first_abort: Option<(String, StepError)> = None;
        for (step_id, result) in results {
            match result {
                Ok(output) => outputs.push(output),
                Err(error) if error.is_aborted() => {
                    if first_abort.is_none() {
                        first_abort = Some((step_id, error));
                    }
                }
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some((step_id, error));
                    }
                }
            }
        }
        match first_error.or(first_abort) {
            Some(failure) => Err(failure),
            None => Ok(outputs),
        }
    }

    async fn dispatch(
        &self,
        workflow: &Workflow,
        step: &Step,
        step_input: &Value,
        run_id: &RunId,
        collector: &TraceCollector,
        cancel: &CancellationToken,
    ) -> Result<Value, StepError> {
        match &step.kind {
            StepKind::Fn { run } => {
                let ctx = StepContext {
                    workflow_id: workflow.id.clone(),
                    step_id: step.id.clone(),
                    run_id: run_id.clone(),
                    trace: collector.sink(),
                    cancel: cancel.clone(),
                    engine: Arc::new(SubEngine {
                        engine: self.clone(),
                        cancel: cancel.clone(),
                    }),
                    working_dir: self.working_dir.clone(),
                };
                run(step_input.clone(), ctx).await
            }

            StepKind::Shell { command, parse, timeout_ms } => {
                let command_line = command(step_input);
                let shell_opts = ShellOpts {
                    cwd: Some(self.working_dir.clone()),
                    env: Vec::new(),
                    timeout: timeout_ms.map(Duration::from_millis),
                    cancel: Some(cancel.clone()),
                };
                match self.shell.exec(&command_line, shell_opts).await {
                    Ok(output) => parse(&output.stdout, output.exit_code),
                    Err(ShellError::Aborted { .. }) => Err(StepError::Aborted),
                    Err(ShellError::TimedOut { timeout_ms, .. }) => {
                        Err(StepError::Timeout { timeout_ms })
                    }
                    Err(error @ ShellError::Spawn { .. }) => Err(StepError::ShellError {
                        command: command_line,
                        exit_code: -1,
                        stderr: error.to_string(),
                    }),
                }
            }

            StepKind::Agent { prompt, mode, opts } => {
                agent_step::execute(
                    &self.agent,
                    &self.clock,
                    AgentDispatch {
                        workflow_id: &workflow.id,
                        step,
                        prompt,
                        mode: *mode,
                        opts,
                        input: step_input,
                        working_dir: &self.working_dir,
                        collector,
                        cancel,
                    },
                )
                .await
            }

            StepKind::Checkpoint { prompt } => {
                let message = prompt(step_input);
                collector.emit(TraceEvent::CheckpointWaiting {
                    ts: self.ts(),
                    step_id: step.id.clone(),
                    prompt: message.clone(),
                });
                let value = tokio::select! {
                    _ = cancel.cancelled() => Err(StepError::Aborted),
                    result = self.checkpoint.prompt(&step.id, &message, &step.output_schema) => {
                        result.map_err(checkpoint_to_step_error)
                    }
                }?;
                collector.emit(TraceEvent::CheckpointResolved {
                    ts: self.ts(),
                    step_id: step.id.clone(),
                    value: value.clone(),
                });
                Ok(value)
            }
        }
    }

    fn step_failure(
        &self,
        collector: &TraceCollector,
        started_ms: u64,
        step_id: String,
        error: StepError,
    ) -> WorkflowError {
        collector.emit(TraceEvent::WorkflowError {
            ts: self.ts(),
            error: format!("step `{}` failed: {}", step_id, error),
        });
        let duration_ms = self.clock.epoch_ms().saturating_sub(started_ms);
        WorkflowError::StepFailed {
            step_id,
            error,
            trace: collector.snapshot(TraceStatus::Failure, duration_ms),
        }
    }

    fn emit_workflow_error(&self, collector: &TraceCollector, error: &WorkflowError) {
        collector.emit(TraceEvent::WorkflowError { ts: self.ts(), error: error.to_string() });
    }
}

fn checkpoint_to_step_error(error: CheckpointError) -> StepError {
    match error {
        CheckpointError::Rejected { reason } => StepError::CheckpointRejected { reason },
        CheckpointError::Invalid { issues } => StepError::ValidationError { issues },
        CheckpointError::NotFound(id) => {
            StepError::execution(format!("checkpoint not found: {}", id))
        }
    }
}

fn replay_sequential(snapshot: &Option<RunSnapshot>, step: &Step) -> Option<Value> {
    snapshot.as_ref()?.completed_steps.get(&step.id).cloned()
}

/// All-or-nothing: a parallel node replays only when every branch output
/// was captured.
fn replay_parallel(snapshot: &Option<RunSnapshot>, branches: &[(Step, Mapper)]) -> Option<Vec<Value>> {
    let snapshot = snapshot.as_ref()?;
    branches
        .iter()
        .map(|(step, _)| snapshot.completed_steps.get(&step.id).cloned())
        .collect()
}

/// Sub-workflow runner handed to `Fn` steps: the same engine with the
/// parent's cancellation signal; fresh run id per child invocation.
struct SubEngine<Sh, Ag, Cp, C> {
    engine: Engine<Sh, Ag, Cp, C>,
    cancel: CancellationToken,
}

#[async_trait]
impl<Sh, Ag, Cp, C> SubWorkflowRunner for SubEngine<Sh, Ag, Cp, C>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
    Cp: CheckpointProvider,
    C: Clock,
{
    async fn run_workflow(
        &self,
        workflow: Arc<Workflow>,
        input: Value,
    ) -> Result<RunOutcome, WorkflowError> {
        self.engine
            .run(
                &workflow,
                input,
                RunOpts { cancel: Some(self.cancel.clone()), ..RunOpts::default() },
            )
            .await
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
