// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent executor abstraction.
//!
//! An agent executor manages sessions on a long-running conversational
//! agent. The engine drives one session per agent step: create, prompt,
//! optionally subscribe to live events, then destroy.
//!
//! # Variants
//!
//! - [`scripted::ScriptedAgent`]: regex-keyed canned replies for tests.
//! - [`remote::RemoteAgent`]: JSON REST binding to a remote agent
//!   service with independent stall detection.

pub mod remote;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors from agent operations
#[derive(Debug, Clone, Error)]
pub enum AgentExecutorError {
    #[error("session create failed: {0}")]
    CreateFailed(String),
    /// Prompt could not complete. Stalls land here with a cause that
    /// references the pending-permission path so an operator can attach.
    #[error("prompt failed: {0}")]
    PromptFailed(String),
    #[error("session destroy failed: {0}")]
    DestroyFailed(String),
    #[error("health check failed: {0}")]
    Unhealthy(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl AgentExecutorError {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentExecutorError::CreateFailed(_) => "create_failed",
            AgentExecutorError::PromptFailed(_) => "prompt_failed",
            AgentExecutorError::DestroyFailed(_) => "destroy_failed",
            AgentExecutorError::Unhealthy(_) => "unhealthy",
            AgentExecutorError::Transport(_) => "transport",
        }
    }
}

/// Configuration for a new session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session title, `runbook:<workflow_id>:<step_id>` for engine steps.
    pub title: String,
    pub system_prompt: Option<String>,
    pub working_dir: PathBuf,
    /// Opaque permission config forwarded to the service.
    pub permissions: Option<Value>,
}

/// Handle to a created session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: String,
    pub title: String,
}

/// One tool invocation reported by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Final response record for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptReply {
    /// Concatenation of the reply's text parts.
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// Paths touched by mutating tools (names containing
    /// write/edit/create/patch).
    pub files_changed: Vec<String>,
    /// Build-mode output payload (session id, files changed, success flag
    /// when the service reports one).
    pub metadata: Value,
}

/// Live event from a subscribed session.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    TextChunk { text: String },
    ToolCall { name: String, args: Value },
    ToolResult { name: String, result: Value },
}

/// Capabilities of an agent service binding.
///
/// `destroy_session`, `subscribe`, and `health_check` are optional
/// capabilities; the defaults make a minimal binding complete.
#[async_trait]
pub trait AgentExecutor: Clone + Send + Sync + 'static {
    async fn create_session(
        &self,
        config: SessionConfig,
    ) -> Result<SessionHandle, AgentExecutorError>;

    /// Send a prompt and wait for the final response record.
    async fn prompt(
        &self,
        session: &SessionHandle,
        text: &str,
    ) -> Result<PromptReply, AgentExecutorError>;

    async fn destroy_session(&self, _session: &SessionHandle) -> Result<(), AgentExecutorError> {
        Ok(())
    }

    /// Start streaming live events for a session into `events` until
    /// `cancel` fires. Returns false when the binding does not support
    /// subscriptions (the default).
    fn subscribe(
        &self,
        _session: &SessionHandle,
        _events: mpsc::Sender<AgentEvent>,
        _cancel: CancellationToken,
    ) -> bool {
        false
    }

    async fn health_check(&self) -> Result<(), AgentExecutorError> {
        Ok(())
    }
}

/// Tool-name fragments that count as file mutations for `files_changed`.
const MUTATING_TOOL_HINTS: [&str; 4] = ["write", "edit", "create", "patch"];

/// True when a tool name indicates the tool changes files.
pub(crate) fn is_mutating_tool(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    MUTATING_TOOL_HINTS.iter().any(|hint| lower.contains(hint))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
