// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow builder.
//!
//! Purely structural: collects step nodes with their mappers and freezes
//! them into a `Workflow`. The builder is consumed by `done`, so the
//! frozen workflow can never observe later mutation.

use rb_core::{map_previous, Mapper, Step, StepNode, Workflow};
use serde_json::Value;

/// Builder for a workflow graph.
pub struct WorkflowBuilder {
    id: String,
    input_schema: Value,
    steps: Vec<StepNode>,
}

impl WorkflowBuilder {
    pub fn new(id: impl Into<String>, input_schema: Value) -> Self {
        Self { id: id.into(), input_schema, steps: Vec::new() }
    }

    /// Append a sequential step with an explicit mapper.
    pub fn pipe(mut self, step: Step, mapper: Mapper) -> Self {
        self.steps.push(StepNode::Sequential { step, mapper });
        self
    }

    /// Append a sequential step fed the previous output unchanged.
    pub fn pipe_prev(self, step: Step) -> Self {
        self.pipe(step, map_previous())
    }

    /// Append a parallel fan-out; the node's output is the tuple of
    /// branch outputs in declaration order.
    pub fn parallel(mut self, branches: Vec<(Step, Mapper)>) -> Self {
        self.steps.push(StepNode::Parallel { branches });
        self
    }

    /// Freeze into a runnable workflow.
    pub fn done(self, output_schema: Value) -> Workflow {
        Workflow {
            id: self.id,
            input_schema: self.input_schema,
            output_schema,
            steps: self.steps,
        }
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
