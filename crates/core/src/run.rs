// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run state and the patch type that is its only mutation surface.

use crate::id::{CheckpointId, RunId};
use crate::trace::{Trace, TraceEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle status of a run. Transitions are monotonic:
/// pending → running → (success | failure | cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failure,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failure | RunStatus::Cancelled)
    }

    /// Whether moving to `next` preserves monotonicity. Terminal states
    /// accept no further transitions; a run may jump straight from
    /// pending to a terminal state (cancel before start).
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match self {
            RunStatus::Pending => next != RunStatus::Pending,
            RunStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
            RunStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Serializable view of a pending checkpoint. The live continuation is
/// owned by the daemon's checkpoint registry and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub checkpoint_id: CheckpointId,
    pub step_id: String,
    pub prompt: String,
}

/// State of one run, owned by the run store for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: RunId,
    pub workflow_id: String,
    pub status: RunStatus,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub trace_events: Vec<TraceEvent>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default)]
    pub pending_checkpoints: Vec<CheckpointInfo>,
}

impl RunState {
    pub fn new(run_id: RunId, workflow_id: impl Into<String>, input: Value, started_at_ms: u64) -> Self {
        Self {
            run_id,
            workflow_id: workflow_id.into(),
            status: RunStatus::Pending,
            input,
            output: None,
            error: None,
            trace_events: Vec::new(),
            started_at_ms,
            completed_at_ms: None,
            pending_checkpoints: Vec::new(),
        }
    }

    /// Shallow-merge a patch. Status changes that would reverse the
    /// monotonic order are ignored (the store logs them).
    pub fn apply(&mut self, patch: RunPatch) -> bool {
        let mut status_ok = true;
        if let Some(status) = patch.status {
            if self.status == status || self.status.can_transition_to(status) {
                self.status = status;
            } else {
                status_ok = false;
            }
        }
        if let Some(output) = patch.output {
            self.output = Some(output);
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        if let Some(completed_at_ms) = patch.completed_at_ms {
            self.completed_at_ms = Some(completed_at_ms);
        }
        if let Some(pending) = patch.pending_checkpoints {
            self.pending_checkpoints = pending;
        }
        status_ok
    }
}

/// Partial update for a run; the store's `update` is the only way state
/// changes after creation.
#[derive(Debug, Clone, Default)]
pub struct RunPatch {
    pub status: Option<RunStatus>,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub completed_at_ms: Option<u64>,
    pub pending_checkpoints: Option<Vec<CheckpointInfo>>,
}

impl RunPatch {
    pub fn status(status: RunStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }
}

/// What a successful engine invocation returns.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output: Value,
    pub trace: Trace,
    pub duration_ms: u64,
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
