// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb-adapters: Provider bindings for the workflow engine.
//!
//! The engine is generic over three provider seams: shell execution,
//! the agent service, and checkpoint resolution. This crate carries the
//! traits plus the concrete bindings: a system shell, a remote agent
//! service client with stall detection, and the scripted in-memory
//! variants used by tests.

pub mod agent;
pub mod checkpoint;
pub mod shell;
pub mod subprocess;

pub use agent::{
    AgentEvent, AgentExecutor, AgentExecutorError, PromptReply, SessionConfig, SessionHandle,
    ToolCall,
};
pub use agent::remote::{RemoteAgent, RemoteAgentConfig};
pub use checkpoint::{CheckpointError, CheckpointProvider, CheckpointRegistry, PendingCheckpoint};
pub use shell::{ShellError, ShellOpts, ShellOutput, ShellProvider, SystemShell};

#[cfg(any(test, feature = "test-support"))]
pub use agent::scripted::{AgentCall, ScriptedAgent, ScriptedReply};
#[cfg(any(test, feature = "test-support"))]
pub use checkpoint::ScriptedCheckpoint;
