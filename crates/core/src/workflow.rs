// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frozen workflow values.
//!
//! A `Workflow` is produced by the builder (rb-engine) and never mutated
//! afterwards. `as_step` is the composition primitive: it wraps a workflow
//! as an `Fn` step that invokes the engine through the step context.

use crate::error::StepError;
use crate::step::{Step, StepKind, StepNode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A validated, runnable workflow graph.
#[derive(Clone)]
pub struct Workflow {
    pub id: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub steps: Vec<StepNode>,
}

impl Workflow {
    /// Ids of every step in graph order (parallel branches in declaration
    /// order).
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().flat_map(|node| node.step_ids()).collect()
    }

    /// Total number of steps across all nodes.
    pub fn step_count(&self) -> usize {
        self.steps.iter().map(|node| node.step_ids().len()).sum()
    }

    pub fn contains_step(&self, step_id: &str) -> bool {
        self.step_ids().iter().any(|id| *id == step_id)
    }

    /// Wrap this workflow as an `Fn` step so it can be piped into another
    /// workflow. The child run inherits the parent's providers, working
    /// directory, and cancellation signal, and runs under a fresh run id;
    /// the parent trace is unaffected.
    pub fn as_step(self: &Arc<Self>) -> Step {
        let workflow = Arc::clone(self);
        Step {
            id: workflow.id.clone(),
            description: Some(format!("workflow `{}` as a step", workflow.id)),
            input_schema: workflow.input_schema.clone(),
            output_schema: workflow.output_schema.clone(),
            kind: StepKind::Fn {
                run: Arc::new(move |input, ctx| {
                    let workflow = Arc::clone(&workflow);
                    Box::pin(async move {
                        let outcome = ctx
                            .engine
                            .run_workflow(workflow, input)
                            .await
                            .map_err(|e| StepError::ExecutionError { cause: e.to_string() })?;
                        Ok(outcome.output)
                    })
                }),
            },
        }
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            id: self.id.clone(),
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
            step_count: self.step_count(),
        }
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("id", &self.id)
            .field("steps", &self.step_ids())
            .finish()
    }
}

/// Shape reported by `GET /workflows`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub step_count: usize,
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
