// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON REST client for the remote agent service.
//!
//! The wire protocol is the service's concern; this client only types the
//! slices the binding needs: the session tree, message parts, pending
//! permissions, and pending questions.

use crate::agent::AgentExecutorError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Per-request timeout; the prompt request is the exception and runs
/// unbounded (the engine and stall monitor own that clock).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTime {
    pub created: u64,
    pub updated: u64,
}

/// One session as reported by `session.list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    /// Link to the spawning session for subagents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub title: String,
    /// True while the service is actively working the session.
    #[serde(default)]
    pub busy: bool,
    pub time: SessionTime,
}

/// A permission request blocking a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionInfo {
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub title: String,
}

/// A question the agent asked; runs are non-interactive so these are
/// always rejected by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionInfo {
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub text: String,
}

/// One part of a message: text or a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    #[serde(rename = "type")]
    pub part_type: String,
    /// Tool parts transition phases (pending → completed); text parts
    /// have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Part {
    pub fn is_text(&self) -> bool {
        self.part_type == "text"
    }

    pub fn is_tool(&self) -> bool {
        self.part_type == "tool"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptResponse {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct CreateSessionBody<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt: Option<&'a str>,
    cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    permissions: Option<&'a Value>,
}

#[derive(Debug, Serialize)]
struct PromptBody<'a> {
    text: &'a str,
}

/// Thin typed client over the agent service HTTP API.
#[derive(Clone)]
pub struct AgentServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl AgentServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn transport(e: reqwest::Error) -> AgentExecutorError {
        AgentExecutorError::Transport(e.to_string())
    }

    async fn expect_ok(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, AgentExecutorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AgentExecutorError::Transport(format!(
            "{} returned {}: {}",
            what,
            status,
            crate::agent::remote::truncate(&body, 200)
        )))
    }

    pub async fn health(&self) -> Result<(), AgentExecutorError> {
        let response = self
            .http
            .get(self.url("/health"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AgentExecutorError::Unhealthy(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AgentExecutorError::Unhealthy(format!(
                "agent service returned {}",
                response.status()
            )))
        }
    }

    pub async fn create_session(
        &self,
        title: &str,
        system_prompt: Option<&str>,
        cwd: &std::path::Path,
        permissions: Option<&Value>,
    ) -> Result<SessionInfo, AgentExecutorError> {
        let body = CreateSessionBody {
            title,
            system_prompt,
            cwd: cwd.display().to_string(),
            permissions,
        };
        let response = self
            .http
            .post(self.url("/session"))
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response, "session create")
            .await?
            .json()
            .await
            .map_err(Self::transport)
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, AgentExecutorError> {
        let response = self
            .http
            .get(self.url("/session"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response, "session list")
            .await?
            .json()
            .await
            .map_err(Self::transport)
    }

    pub async fn destroy_session(&self, session_id: &str) -> Result<(), AgentExecutorError> {
        let response = self
            .http
            .delete(self.url(&format!("/session/{}", session_id)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response, "session destroy").await.map(|_| ())
    }

    /// Abort in-flight work without destroying the session.
    pub async fn abort_session(&self, session_id: &str) -> Result<(), AgentExecutorError> {
        let response = self
            .http
            .post(self.url(&format!("/session/{}/abort", session_id)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response, "session abort").await.map(|_| ())
    }

    /// Send a prompt. Unbounded: the caller races this against its own
    /// timer and the stall monitor.
    pub async fn prompt(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<PromptResponse, AgentExecutorError> {
        let response = self
            .http
            .post(self.url(&format!("/session/{}/prompt", session_id)))
            .json(&PromptBody { text })
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response, "prompt")
            .await?
            .json()
            .await
            .map_err(Self::transport)
    }

    pub async fn messages(&self, session_id: &str) -> Result<Vec<MessageInfo>, AgentExecutorError> {
        let response = self
            .http
            .get(self.url(&format!("/session/{}/message", session_id)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response, "message list")
            .await?
            .json()
            .await
            .map_err(Self::transport)
    }

    pub async fn permissions(
        &self,
        session_id: &str,
    ) -> Result<Vec<PermissionInfo>, AgentExecutorError> {
        let response = self
            .http
            .get(self.url(&format!("/session/{}/permission", session_id)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response, "permission list")
            .await?
            .json()
            .await
            .map_err(Self::transport)
    }

    pub async fn questions(
        &self,
        session_id: &str,
    ) -> Result<Vec<QuestionInfo>, AgentExecutorError> {
        let response = self
            .http
            .get(self.url(&format!("/session/{}/question", session_id)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response, "question list")
            .await?
            .json()
            .await
            .map_err(Self::transport)
    }

    pub async fn reject_question(&self, question_id: &str) -> Result<(), AgentExecutorError> {
        let response = self
            .http
            .post(self.url(&format!("/question/{}/reject", question_id)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response, "question reject").await.map(|_| ())
    }
}
