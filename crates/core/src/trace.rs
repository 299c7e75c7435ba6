// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed trace events for a workflow run.
//!
//! Serializes with `{"type": "step:start", ...fields}` format. Every event
//! carries `ts` (epoch milliseconds). Within one run the event order is the
//! engine's emission order: `workflow:start` first, exactly one of
//! `workflow:complete` / `workflow:error` last, and step events contiguous
//! per step within a sequential branch.

use crate::error::StepError;
use crate::id::RunId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event in a run's trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TraceEvent {
    // -- workflow --
    #[serde(rename = "workflow:start")]
    WorkflowStart { ts: u64, run_id: RunId, workflow_id: String, input: Value },

    #[serde(rename = "workflow:complete")]
    WorkflowComplete { ts: u64, output: Value, duration_ms: u64 },

    #[serde(rename = "workflow:error")]
    WorkflowError { ts: u64, error: String },

    // -- step --
    #[serde(rename = "step:start")]
    StepStart { ts: u64, step_id: String, input: Value },

    #[serde(rename = "step:complete")]
    StepComplete { ts: u64, step_id: String, output: Value, duration_ms: u64 },

    #[serde(rename = "step:error")]
    StepError { ts: u64, step_id: String, error: StepError, duration_ms: u64 },

    #[serde(rename = "step:skipped")]
    StepSkipped { ts: u64, step_id: String, reason: String },

    // -- agent --
    #[serde(rename = "agent:session_created")]
    AgentSessionCreated { ts: u64, step_id: String, session_id: String, title: String },

    #[serde(rename = "agent:prompt_sent")]
    AgentPromptSent { ts: u64, step_id: String, prompt: String },

    #[serde(rename = "agent:tool_call")]
    AgentToolCall { ts: u64, step_id: String, tool: String, args: Value },

    #[serde(rename = "agent:tool_result")]
    AgentToolResult { ts: u64, step_id: String, tool: String, result: Value },

    #[serde(rename = "agent:text")]
    AgentText { ts: u64, step_id: String, text: String },

    #[serde(rename = "agent:response")]
    AgentResponse { ts: u64, step_id: String, response: Value },

    // -- checkpoint --
    #[serde(rename = "checkpoint:waiting")]
    CheckpointWaiting { ts: u64, step_id: String, prompt: String },

    #[serde(rename = "checkpoint:resolved")]
    CheckpointResolved { ts: u64, step_id: String, value: Value },
}

impl TraceEvent {
    pub fn ts(&self) -> u64 {
        match self {
            TraceEvent::WorkflowStart { ts, .. }
            | TraceEvent::WorkflowComplete { ts, .. }
            | TraceEvent::WorkflowError { ts, .. }
            | TraceEvent::StepStart { ts, .. }
            | TraceEvent::StepComplete { ts, .. }
            | TraceEvent::StepError { ts, .. }
            | TraceEvent::StepSkipped { ts, .. }
            | TraceEvent::AgentSessionCreated { ts, .. }
            | TraceEvent::AgentPromptSent { ts, .. }
            | TraceEvent::AgentToolCall { ts, .. }
            | TraceEvent::AgentToolResult { ts, .. }
            | TraceEvent::AgentText { ts, .. }
            | TraceEvent::AgentResponse { ts, .. }
            | TraceEvent::CheckpointWaiting { ts, .. }
            | TraceEvent::CheckpointResolved { ts, .. } => *ts,
        }
    }

    /// Step id the event belongs to, when it is step-scoped.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            TraceEvent::StepStart { step_id, .. }
            | TraceEvent::StepComplete { step_id, .. }
            | TraceEvent::StepError { step_id, .. }
            | TraceEvent::StepSkipped { step_id, .. }
            | TraceEvent::AgentSessionCreated { step_id, .. }
            | TraceEvent::AgentPromptSent { step_id, .. }
            | TraceEvent::AgentToolCall { step_id, .. }
            | TraceEvent::AgentToolResult { step_id, .. }
            | TraceEvent::AgentText { step_id, .. }
            | TraceEvent::AgentResponse { step_id, .. }
            | TraceEvent::CheckpointWaiting { step_id, .. }
            | TraceEvent::CheckpointResolved { step_id, .. } => Some(step_id),
            _ => None,
        }
    }

    /// The serde type tag, for display and SSE event names.
    pub fn kind(&self) -> &'static str {
        match self {
            TraceEvent::WorkflowStart { .. } => "workflow:start",
            TraceEvent::WorkflowComplete { .. } => "workflow:complete",
            TraceEvent::WorkflowError { .. } => "workflow:error",
            TraceEvent::StepStart { .. } => "step:start",
            TraceEvent::StepComplete { .. } => "step:complete",
            TraceEvent::StepError { .. } => "step:error",
            TraceEvent::StepSkipped { .. } => "step:skipped",
            TraceEvent::AgentSessionCreated { .. } => "agent:session_created",
            TraceEvent::AgentPromptSent { .. } => "agent:prompt_sent",
            TraceEvent::AgentToolCall { .. } => "agent:tool_call",
            TraceEvent::AgentToolResult { .. } => "agent:tool_result",
            TraceEvent::AgentText { .. } => "agent:text",
            TraceEvent::AgentResponse { .. } => "agent:response",
            TraceEvent::CheckpointWaiting { .. } => "checkpoint:waiting",
            TraceEvent::CheckpointResolved { .. } => "checkpoint:resolved",
        }
    }

    /// True for `step:complete`, `step:error`, and `step:skipped`.
    pub fn is_step_terminal(&self) -> bool {
        matches!(
            self,
            TraceEvent::StepComplete { .. }
                | TraceEvent::StepError { .. }
                | TraceEvent::StepSkipped { .. }
        )
    }
}

/// Terminal status recorded on a trace snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Success,
    Failure,
}

/// Immutable snapshot of a run's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub run_id: RunId,
    pub workflow_id: String,
    pub events: Vec<TraceEvent>,
    pub status: TraceStatus,
    pub duration_ms: u64,
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
