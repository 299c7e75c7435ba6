// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot-based resume.
//!
//! A snapshot is the replay summary of a previous run: the prefix of step
//! outputs that were captured plus the step id execution resumes from.
//! The engine skips completed steps (emitting `step:skipped`) and
//! substitutes the stored outputs.

use crate::id::RunId;
use crate::trace::TraceEvent;
use crate::workflow::Workflow;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Replay summary built from a prior run's trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Run the snapshot was taken from.
    pub run_id: RunId,
    pub workflow_id: String,
    pub input: Value,
    /// Captured outputs keyed by step id, in completion order.
    pub completed_steps: IndexMap<String, Value>,
    /// First step following the completed prefix.
    pub resume_at: String,
    /// Events of the source run up to the snapshot point, kept for the
    /// record; the resumed run starts a fresh trace.
    pub trace_events: Vec<TraceEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot references unknown step `{0}`")]
    UnknownStep(String),
    #[error("snapshot resume_at `{expected}` does not follow the completed prefix (found `{found}`)")]
    ResumePointMismatch { expected: String, found: String },
    #[error("snapshot is for workflow `{snapshot}` but the run targets `{workflow}`")]
    WorkflowMismatch { snapshot: String, workflow: String },
}

impl RunSnapshot {
    /// Check consistency against a workflow graph: every completed id must
    /// name a workflow step, and `resume_at` must be the first step (in
    /// graph order) outside the completed prefix.
    pub fn verify(&self, workflow: &Workflow) -> Result<(), SnapshotError> {
        if self.workflow_id != workflow.id {
            return Err(SnapshotError::WorkflowMismatch {
                snapshot: self.workflow_id.clone(),
                workflow: workflow.id.clone(),
            });
        }
        let ids = workflow.step_ids();
        for completed in self.completed_steps.keys() {
            if !ids.iter().any(|id| id == completed) {
                return Err(SnapshotError::UnknownStep(completed.clone()));
            }
        }
        match ids.iter().find(|id| !self.completed_steps.contains_key(**id)) {
            Some(first_pending) if *first_pending == self.resume_at => Ok(()),
            Some(first_pending) => Err(SnapshotError::ResumePointMismatch {
                expected: self.resume_at.clone(),
                found: (*first_pending).to_string(),
            }),
            // Everything completed: resume_at has nothing to point at.
            None => Err(SnapshotError::ResumePointMismatch {
                expected: self.resume_at.clone(),
                found: "<complete>".to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
