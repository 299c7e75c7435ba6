// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb-core: Data model for the runbook workflow server.
//!
//! Workflows, steps, traces, run state, snapshots, and the schema
//! validation that travels with every step boundary.

pub mod clock;
pub mod context;
pub mod error;
pub mod id;
pub mod run;
pub mod schema;
pub mod snapshot;
pub mod step;
pub mod time_fmt;
pub mod trace;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{StepContext, SubWorkflowRunner, TraceSink};
pub use error::{StepError, WorkflowError};
pub use id::{short, CheckpointId, RunId};
pub use run::{CheckpointInfo, RunOutcome, RunPatch, RunState, RunStatus};
pub use schema::{is_valid, issues_summary, schema_to_text, validate_schema, SchemaIssue};
pub use snapshot::{RunSnapshot, SnapshotError};
pub use step::{
    map_previous, map_workflow_input, AgentMode, AgentStepOpts, CommandFn, FnStepBody, Mapper,
    ParseFn, PromptFn, Step, StepKind, StepNode, DEFAULT_AGENT_TIMEOUT_MS,
};
pub use time_fmt::format_elapsed_ms;
pub use trace::{Trace, TraceEvent, TraceStatus};
pub use workflow::{Workflow, WorkflowSummary};
