// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed step values.
//!
//! A step is one unit of work with input and output schemas and a kind
//! tag the engine dispatches on. Step bodies are closures behind `Arc`
//! so workflows stay cheap to clone and shareable across runs.

use crate::context::StepContext;
use crate::error::StepError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Body of an `Fn` step.
pub type FnStepBody =
    Arc<dyn Fn(Value, StepContext) -> BoxFuture<Result<Value, StepError>> + Send + Sync>;

/// Builds the shell command line from the step input.
pub type CommandFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Parses captured stdout plus exit code into the step output.
pub type ParseFn = Arc<dyn Fn(&str, i32) -> Result<Value, StepError> + Send + Sync>;

/// Builds the agent or checkpoint prompt from the step input.
pub type PromptFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Pure function from `(workflow_input, previous_output)` to a step's input.
pub type Mapper = Arc<dyn Fn(&Value, &Value) -> Result<Value, StepError> + Send + Sync>;

/// How an agent step's reply becomes its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Extract JSON from the reply text and validate it against the
    /// output schema. The output schema is appended to the system prompt.
    Analyze,
    /// The reply metadata (files changed, success flag) is the output.
    Build,
}

/// Options for an agent step.
#[derive(Debug, Clone)]
pub struct AgentStepOpts {
    /// Inline system prompt fragment.
    pub system_prompt: Option<String>,
    /// File whose contents lead the system prompt. Relative paths resolve
    /// against the engine's working directory.
    pub system_prompt_file: Option<PathBuf>,
    /// Prompt timeout. The engine races the prompt against this timer.
    pub timeout_ms: u64,
    /// Opaque permission config forwarded to the agent service.
    pub permissions: Option<Value>,
}

pub const DEFAULT_AGENT_TIMEOUT_MS: u64 = 180_000;

impl Default for AgentStepOpts {
    fn default() -> Self {
        Self {
            system_prompt: None,
            system_prompt_file: None,
            timeout_ms: DEFAULT_AGENT_TIMEOUT_MS,
            permissions: None,
        }
    }
}

/// Kind tag the engine dispatches on.
#[derive(Clone)]
pub enum StepKind {
    Fn {
        run: FnStepBody,
    },
    Shell {
        command: CommandFn,
        parse: ParseFn,
        /// Shell steps have no intrinsic timeout unless one is set here.
        timeout_ms: Option<u64>,
    },
    Agent {
        prompt: PromptFn,
        mode: AgentMode,
        opts: AgentStepOpts,
    },
    Checkpoint {
        prompt: PromptFn,
    },
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Fn { .. } => "fn",
            StepKind::Shell { .. } => "shell",
            StepKind::Agent { .. } => "agent",
            StepKind::Checkpoint { .. } => "checkpoint",
        }
    }
}

/// One typed unit of work.
#[derive(Clone)]
pub struct Step {
    pub id: String,
    pub description: Option<String>,
    pub input_schema: Value,
    pub output_schema: Value,
    pub kind: StepKind,
}

impl Step {
    /// Pure computation step.
    pub fn function<F, Fut>(id: impl Into<String>, input_schema: Value, output_schema: Value, run: F) -> Self
    where
        F: Fn(Value, StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, StepError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            description: None,
            input_schema,
            output_schema,
            kind: StepKind::Fn { run: Arc::new(move |input, ctx| Box::pin(run(input, ctx))) },
        }
    }

    /// Subprocess step.
    pub fn shell<Cmd, P>(id: impl Into<String>, input_schema: Value, output_schema: Value, command: Cmd, parse: P) -> Self
    where
        Cmd: Fn(&Value) -> String + Send + Sync + 'static,
        P: Fn(&str, i32) -> Result<Value, StepError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: None,
            input_schema,
            output_schema,
            kind: StepKind::Shell {
                command: Arc::new(command),
                parse: Arc::new(parse),
                timeout_ms: None,
            },
        }
    }

    /// Agent step.
    pub fn agent<P>(id: impl Into<String>, input_schema: Value, output_schema: Value, mode: AgentMode, prompt: P) -> Self
    where
        P: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: None,
            input_schema,
            output_schema,
            kind: StepKind::Agent {
                prompt: Arc::new(prompt),
                mode,
                opts: AgentStepOpts::default(),
            },
        }
    }

    /// Human-approval step; suspends until an external resolver supplies
    /// a value matching the output schema.
    pub fn checkpoint<P>(id: impl Into<String>, input_schema: Value, output_schema: Value, prompt: P) -> Self
    where
        P: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: None,
            input_schema,
            output_schema,
            kind: StepKind::Checkpoint { prompt: Arc::new(prompt) },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Override agent step options; no-op for other kinds.
    pub fn with_agent_opts(mut self, new_opts: AgentStepOpts) -> Self {
        if let StepKind::Agent { opts, .. } = &mut self.kind {
            *opts = new_opts;
        }
        self
    }

    /// Set a shell timeout; no-op for other kinds.
    pub fn with_shell_timeout_ms(mut self, ms: u64) -> Self {
        if let StepKind::Shell { timeout_ms, .. } = &mut self.kind {
            *timeout_ms = Some(ms);
        }
        self
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("kind", &self.kind.name())
            .finish()
    }
}

/// A scheduling node: one step, or a fan-out of branches.
#[derive(Clone)]
pub enum StepNode {
    Sequential { step: Step, mapper: Mapper },
    Parallel { branches: Vec<(Step, Mapper)> },
}

impl StepNode {
    /// Ids of every step under this node, in declaration order.
    pub fn step_ids(&self) -> Vec<&str> {
        match self {
            StepNode::Sequential { step, .. } => vec![step.id.as_str()],
            StepNode::Parallel { branches } => {
                branches.iter().map(|(step, _)| step.id.as_str()).collect()
            }
        }
    }
}

/// Mapper passing the previous step's output through unchanged.
pub fn map_previous() -> Mapper {
    Arc::new(|_workflow_input, previous| Ok(previous.clone()))
}

/// Mapper passing the workflow input through unchanged.
pub fn map_workflow_input() -> Mapper {
    Arc::new(|workflow_input, _previous| Ok(workflow_input.clone()))
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
