// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step- and workflow-level error axes.
//!
//! `StepError` is what a single step produces; `WorkflowError` is what a
//! whole run surfaces. Both serialize with a machine-readable `kind` tag
//! so clients and the artifact store never have to parse display strings.
//! Transport errors (shell, agent service, checkpoint, git store, HTTP
//! client) live with their adapters.

use crate::schema::{issues_summary, SchemaIssue};
use crate::trace::Trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    /// Step input or output did not match its schema.
    #[error("validation failed: {}", issues_summary(.issues))]
    ValidationError { issues: Vec<SchemaIssue> },

    /// Mapper or step body failed outside the typed paths.
    #[error("execution failed: {cause}")]
    ExecutionError { cause: String },

    /// Shell command spawned but failed, or could not spawn (exit_code -1).
    #[error("shell command `{command}` failed with exit code {exit_code}: {stderr}")]
    ShellError { command: String, exit_code: i32, stderr: String },

    /// The agent executor reported a failure (transport, stall, abort).
    #[error("agent failed: {cause}")]
    AgentError { cause: String },

    /// Agent replied but the reply could not be turned into the output type.
    #[error("agent response could not be parsed: {}", issues_summary(.issues))]
    AgentParseError { raw_output: String, issues: Vec<SchemaIssue> },

    /// Step exceeded its timeout.
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Run was cancelled while the step was in flight.
    #[error("aborted")]
    Aborted,

    /// A checkpoint resolver rejected the pending value.
    #[error("checkpoint rejected: {reason}")]
    CheckpointRejected { reason: String },
}

impl StepError {
    /// Machine-readable kind tag, stable across formatting changes.
    pub fn kind(&self) -> &'static str {
        match self {
            StepError::ValidationError { .. } => "validation_error",
            StepError::ExecutionError { .. } => "execution_error",
            StepError::ShellError { .. } => "shell_error",
            StepError::AgentError { .. } => "agent_error",
            StepError::AgentParseError { .. } => "agent_parse_error",
            StepError::Timeout { .. } => "timeout",
            StepError::Aborted => "aborted",
            StepError::CheckpointRejected { .. } => "checkpoint_rejected",
        }
    }

    pub fn execution(cause: impl Into<String>) -> Self {
        StepError::ExecutionError { cause: cause.into() }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, StepError::Aborted)
    }
}

/// Failure of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowError {
    /// A step failed; carries the partial trace up to the failure.
    #[error("step `{step_id}` failed: {error}")]
    StepFailed { step_id: String, error: StepError, trace: Trace },

    /// Input (or final output) did not match the workflow schema.
    #[error("invalid workflow input/output: {}", issues_summary(.issues))]
    InvalidWorkflow { issues: Vec<SchemaIssue> },

    /// Server-side wiring problem (unknown workflow, bad provider setup).
    #[error("configuration error: {message}")]
    ConfigError { message: String },
}

impl WorkflowError {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::StepFailed { .. } => "step_failed",
            WorkflowError::InvalidWorkflow { .. } => "invalid_workflow",
            WorkflowError::ConfigError { .. } => "config_error",
        }
    }

    /// True when the run died because its cancellation signal fired.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            WorkflowError::StepFailed { error: StepError::Aborted, .. }
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        WorkflowError::ConfigError { message: message.into() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
