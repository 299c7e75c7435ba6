// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the runbook daemon.
//!
//! `RUNBOOK_URL` overrides the default server URL. All responses come
//! back as JSON values; the commands layer decides presentation.

use serde_json::Value;
use thiserror::Error;

/// Default control-plane URL; `RUNBOOK_URL` overrides.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:4400";

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response; carries the server's error message.
    #[error("server returned {status}: {message}")]
    Http { status: u16, message: String },
    #[error("could not reach the server: {0}")]
    Transport(String),
    #[error("malformed server response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Http { .. } => "http",
            ClientError::Transport(_) => "transport",
            ClientError::Decode(_) => "decode",
        }
    }
}

/// Typed facade over the daemon's control plane.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn decode(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        if status.is_success() {
            return Ok(body);
        }
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        Err(ClientError::Http { status: status.as_u16(), message })
    }

    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        let response = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.get("/health").await
    }

    pub async fn workflows(&self) -> Result<Value, ClientError> {
        self.get("/workflows").await
    }

    pub async fn submit(&self, workflow_id: &str, input: Value) -> Result<Value, ClientError> {
        self.post(&format!("/workflows/{}/run", workflow_id), serde_json::json!({"input": input}))
            .await
    }

    pub async fn resume(&self, workflow_id: &str, run_id: &str) -> Result<Value, ClientError> {
        self.post(
            &format!("/workflows/{}/resume/{}", workflow_id, run_id),
            serde_json::json!({}),
        )
        .await
    }

    pub async fn runs(&self) -> Result<Value, ClientError> {
        self.get("/runs").await
    }

    pub async fn run(&self, run_id: &str) -> Result<Value, ClientError> {
        self.get(&format!("/runs/{}", run_id)).await
    }

    pub async fn trace(&self, run_id: &str) -> Result<Value, ClientError> {
        self.get(&format!("/runs/{}/trace", run_id)).await
    }

    pub async fn cancel(&self, run_id: &str) -> Result<Value, ClientError> {
        self.post(&format!("/runs/{}/cancel", run_id), serde_json::json!({})).await
    }

    pub async fn resolve_checkpoint(
        &self,
        run_id: &str,
        checkpoint_id: &str,
        value: Value,
    ) -> Result<Value, ClientError> {
        self.post(
            &format!("/runs/{}/checkpoints/{}", run_id, checkpoint_id),
            serde_json::json!({"value": value}),
        )
        .await
    }

    pub async fn history(
        &self,
        workflow_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Value, ClientError> {
        self.get(&history_path(workflow_id, limit)).await
    }

    /// Open the SSE stream for a run.
    pub async fn events(&self, run_id: &str) -> Result<reqwest::Response, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/runs/{}/events", run_id)))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ClientError::Http {
                status: response.status().as_u16(),
                message: "event stream unavailable".to_string(),
            });
        }
        Ok(response)
    }
}

fn history_path(workflow_id: Option<&str>, limit: Option<usize>) -> String {
    let mut path = "/runs/history".to_string();
    let mut separator = '?';
    if let Some(workflow_id) = workflow_id {
        path.push_str(&format!("{}workflow_id={}", separator, workflow_id));
        separator = '&';
    }
    if let Some(limit) = limit {
        path.push_str(&format!("{}limit={}", separator, limit));
    }
    path
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
