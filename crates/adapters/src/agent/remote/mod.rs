// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote agent service binding.
//!
//! Sessions live on a remote agent service; this binding drives them over
//! JSON REST and pairs every prompt with an independent stall monitor
//! (see `monitor`). Live events come from a polling subscription that
//! deduplicates message parts (see `subscribe`).

pub(crate) mod client;
pub(crate) mod monitor;
pub(crate) mod subscribe;

use super::{
    AgentEvent, AgentExecutor, AgentExecutorError, PromptReply, SessionConfig, SessionHandle,
};
use async_trait::async_trait;
use client::{AgentServiceClient, Part};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Default agent service URL; `RUNBOOK_AGENT_URL` overrides.
pub const DEFAULT_AGENT_URL: &str = "http://localhost:4096";

/// Session tree poll cadence for the stall monitor.
const MONITOR_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Message poll cadence for subscriptions.
const SUBSCRIBE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Idle budget before a session counts as stalled.
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(180);

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

/// Tuning knobs for the remote binding.
#[derive(Debug, Clone)]
pub struct RemoteAgentConfig {
    pub base_url: String,
    pub stale_timeout: Duration,
    pub monitor_poll_interval: Duration,
    pub subscribe_poll_interval: Duration,
}

impl Default for RemoteAgentConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AGENT_URL.to_string(),
            stale_timeout: DEFAULT_STALE_TIMEOUT,
            monitor_poll_interval: MONITOR_POLL_INTERVAL,
            subscribe_poll_interval: SUBSCRIBE_POLL_INTERVAL,
        }
    }
}

/// Agent executor bound to a remote agent service.
#[derive(Clone)]
pub struct RemoteAgent {
    client: AgentServiceClient,
    config: RemoteAgentConfig,
}

impl RemoteAgent {
    pub fn new(config: RemoteAgentConfig) -> Self {
        Self { client: AgentServiceClient::new(config.base_url.clone()), config }
    }

    /// Binding with default tuning against `base_url`.
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self::new(RemoteAgentConfig { base_url: base_url.into(), ..RemoteAgentConfig::default() })
    }

    /// Assemble the final response record from the reply parts.
    fn reply_from_parts(session_id: &str, parts: Vec<Part>) -> PromptReply {
        let mut text_fragments = Vec::new();
        let mut tool_calls = Vec::new();
        let mut files_changed: Vec<String> = Vec::new();

        for part in parts {
            if part.is_text() {
                if let Some(text) = part.text {
                    text_fragments.push(text);
                }
            } else if part.is_tool() {
                if let Some(name) = part.tool {
                    let args = part.args.unwrap_or(Value::Null);
                    if super::is_mutating_tool(&name) {
                        if let Some(path) = args.get("path").and_then(Value::as_str) {
                            if !files_changed.iter().any(|p| p == path) {
                                files_changed.push(path.to_string());
                            }
                        }
                    }
                    tool_calls.push(super::ToolCall { name, args, result: part.result });
                }
            }
        }

        let metadata = json!({
            "session_id": session_id,
            "files_changed": files_changed,
        });
        PromptReply { text: text_fragments.concat(), tool_calls, files_changed, metadata }
    }
}

#[async_trait]
impl AgentExecutor for RemoteAgent {
    async fn create_session(
        &self,
        config: SessionConfig,
    ) -> Result<SessionHandle, AgentExecutorError> {
        let info = self
            .client
            .create_session(
                &config.title,
                config.system_prompt.as_deref(),
                &config.working_dir,
                config.permissions.as_ref(),
            )
            .await
            .map_err(|e| AgentExecutorError::CreateFailed(e.to_string()))?;
        tracing::info!(session_id = %info.id, title = %config.title, "agent session created");
        Ok(SessionHandle { session_id: info.id, title: config.title })
    }

    async fn prompt(
        &self,
        session: &SessionHandle,
        text: &str,
    ) -> Result<PromptReply, AgentExecutorError> {
        let monitor_cancel = CancellationToken::new();
        let (stall_tx, stall_rx) = oneshot::channel();
        let monitor = tokio::spawn(monitor::run_monitor(
            self.client.clone(),
            session.session_id.clone(),
            self.config.stale_timeout,
            self.config.monitor_poll_interval,
            monitor_cancel.clone(),
            stall_tx,
        ));

        let result = tokio::select! {
            response = self.client.prompt(&session.session_id, text) => {
                response.map(|r| Self::reply_from_parts(&session.session_id, r.parts))
            }
            summary = stall_rx => {
                // Session was aborted by the monitor and intentionally not
                // destroyed, so an operator can attach and inspect.
                let cause = match summary {
                    Ok(summary) => summary.describe(),
                    Err(_) => "stall monitor exited unexpectedly".to_string(),
                };
                Err(AgentExecutorError::PromptFailed(cause))
            }
        };
        monitor_cancel.cancel();
        monitor.abort();
        result
    }

    async fn destroy_session(&self, session: &SessionHandle) -> Result<(), AgentExecutorError> {
        self.client
            .destroy_session(&session.session_id)
            .await
            .map_err(|e| AgentExecutorError::DestroyFailed(e.to_string()))
    }

    fn subscribe(
        &self,
        session: &SessionHandle,
        events: mpsc::Sender<AgentEvent>,
        cancel: CancellationToken,
    ) -> bool {
        tokio::spawn(subscribe::poll_events(
            self.client.clone(),
            session.session_id.clone(),
            self.config.subscribe_poll_interval,
            events,
            cancel,
        ));
        true
    }

    async fn health_check(&self) -> Result<(), AgentExecutorError> {
        self.client.health().await
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
