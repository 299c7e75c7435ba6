// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted agent executor for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    AgentEvent, AgentExecutor, AgentExecutorError, PromptReply, SessionConfig, SessionHandle,
    ToolCall,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Recorded call to ScriptedAgent
#[derive(Debug, Clone)]
pub enum AgentCall {
    CreateSession { title: String, system_prompt: Option<String> },
    Prompt { session_id: String, text: String },
    DestroySession { session_id: String },
    HealthCheck,
}

/// One canned reply, keyed by a regex over the prompt text.
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub metadata: Value,
    /// Simulated think time before the reply lands.
    pub delay: Option<Duration>,
    /// Events pushed to subscribers before the reply.
    pub events: Vec<AgentEvent>,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
            metadata: Value::Object(serde_json::Map::new()),
            delay: None,
            events: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    pub fn with_event(mut self, event: AgentEvent) -> Self {
        self.events.push(event);
        self
    }
}

struct ScriptedState {
    rules: Vec<(Regex, ScriptedReply)>,
    calls: Vec<AgentCall>,
    next_session: u64,
    subscribers: Vec<(String, mpsc::Sender<AgentEvent>)>,
    health_error: Option<String>,
    health_failures_remaining: u32,
}

/// Scripted agent executor: regex-keyed canned replies with recorded calls.
#[derive(Clone)]
pub struct ScriptedAgent {
    inner: Arc<Mutex<ScriptedState>>,
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScriptedState {
                rules: Vec::new(),
                calls: Vec::new(),
                next_session: 1,
                subscribers: Vec::new(),
                health_error: None,
                health_failures_remaining: 0,
            })),
        }
    }

    /// Register a canned reply for prompts matching `pattern`.
    ///
    /// Panics on an invalid pattern; scripted providers are test-only.
    #[allow(clippy::panic)]
    pub fn respond(self, pattern: &str, reply: ScriptedReply) -> Self {
        let regex = match Regex::new(pattern) {
            Ok(r) => r,
            Err(e) => panic!("invalid scripted pattern {:?}: {}", pattern, e),
        };
        self.inner.lock().rules.push((regex, reply));
        self
    }

    /// Shorthand for a text-only reply.
    pub fn respond_text(self, pattern: &str, text: impl Into<String>) -> Self {
        self.respond(pattern, ScriptedReply::text(text))
    }

    /// Make the next `failures` health checks fail with `cause`.
    pub fn fail_health_checks(&self, failures: u32, cause: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.health_error = Some(cause.into());
        inner.health_failures_remaining = failures;
    }

    /// All recorded calls
    pub fn calls(&self) -> Vec<AgentCall> {
        self.inner.lock().calls.clone()
    }

    /// Session ids with an active subscription.
    pub fn subscribed_sessions(&self) -> Vec<String> {
        self.inner.lock().subscribers.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl AgentExecutor for ScriptedAgent {
    async fn create_session(
        &self,
        config: SessionConfig,
    ) -> Result<SessionHandle, AgentExecutorError> {
        let mut inner = self.inner.lock();
        let session_id = format!("scripted-{}", inner.next_session);
        inner.next_session += 1;
        inner.calls.push(AgentCall::CreateSession {
            title: config.title.clone(),
            system_prompt: config.system_prompt.clone(),
        });
        Ok(SessionHandle { session_id, title: config.title })
    }

    async fn prompt(
        &self,
        session: &SessionHandle,
        text: &str,
    ) -> Result<PromptReply, AgentExecutorError> {
        let (reply, subscribers) = {
            let mut inner = self.inner.lock();
            inner.calls.push(AgentCall::Prompt {
                session_id: session.session_id.clone(),
                text: text.to_string(),
            });
            let reply = inner
                .rules
                .iter()
                .find(|(regex, _)| regex.is_match(text))
                .map(|(_, reply)| reply.clone());
            let subscribers: Vec<_> = inner
                .subscribers
                .iter()
                .filter(|(id, _)| *id == session.session_id)
                .map(|(_, tx)| tx.clone())
                .collect();
            (reply, subscribers)
        };

        let reply = reply.ok_or_else(|| {
            AgentExecutorError::PromptFailed(format!("no scripted reply matches prompt: {}", text))
        })?;

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        for event in &reply.events {
            for tx in &subscribers {
                let _ = tx.send(event.clone()).await;
            }
        }

        let files_changed = reply
            .tool_calls
            .iter()
            .filter(|call| super::is_mutating_tool(&call.name))
            .filter_map(|call| call.args.get("path").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        Ok(PromptReply {
            text: reply.text,
            tool_calls: reply.tool_calls,
            files_changed,
            metadata: reply.metadata,
        })
    }

    async fn destroy_session(&self, session: &SessionHandle) -> Result<(), AgentExecutorError> {
        let mut inner = self.inner.lock();
        inner.calls.push(AgentCall::DestroySession { session_id: session.session_id.clone() });
        inner.subscribers.retain(|(id, _)| *id != session.session_id);
        Ok(())
    }

    fn subscribe(
        &self,
        session: &SessionHandle,
        events: mpsc::Sender<AgentEvent>,
        cancel: CancellationToken,
    ) -> bool {
        self.inner.lock().subscribers.push((session.session_id.clone(), events));
        let inner = Arc::clone(&self.inner);
        let session_id = session.session_id.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            inner.lock().subscribers.retain(|(id, _)| *id != session_id);
        });
        true
    }

    async fn health_check(&self) -> Result<(), AgentExecutorError> {
        let mut inner = self.inner.lock();
        inner.calls.push(AgentCall::HealthCheck);
        if inner.health_failures_remaining > 0 {
            inner.health_failures_remaining -= 1;
            let cause = inner.health_error.clone().unwrap_or_else(|| "unhealthy".to_string());
            return Err(AgentExecutorError::Unhealthy(cause));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "scripted_tests.rs"]
mod tests;
