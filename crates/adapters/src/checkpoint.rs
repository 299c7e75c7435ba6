// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint providers: suspension until an external value arrives.
//!
//! A checkpoint step turns a prompt into a future that resolves when a
//! resolver supplies a schema-valid value. The daemon uses the registry
//! variant (oneshot continuations resolved over HTTP); tests use the
//! scripted variant.

use async_trait::async_trait;
use parking_lot::Mutex;
use rb_core::{validate_schema, CheckpointId, CheckpointInfo, RunId, SchemaIssue};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from checkpoint resolution.
#[derive(Debug, Clone, Error)]
pub enum CheckpointError {
    #[error("checkpoint rejected: {reason}")]
    Rejected { reason: String },
    #[error("supplied value failed schema validation")]
    Invalid { issues: Vec<SchemaIssue> },
    #[error("checkpoint not found: {0}")]
    NotFound(String),
}

/// Suspension primitive: `prompt` resolves once a resolver supplies a
/// schema-valid value (or rejects).
#[async_trait]
pub trait CheckpointProvider: Clone + Send + Sync + 'static {
    async fn prompt(
        &self,
        step_id: &str,
        message: &str,
        schema: &Value,
    ) -> Result<Value, CheckpointError>;
}

/// A registered continuation awaiting resolution.
pub struct PendingCheckpoint {
    pub checkpoint_id: CheckpointId,
    pub run_id: RunId,
    pub step_id: String,
    pub prompt: String,
    pub schema: Value,
    tx: oneshot::Sender<Result<Value, CheckpointError>>,
}

impl PendingCheckpoint {
    pub fn info(&self) -> CheckpointInfo {
        CheckpointInfo {
            checkpoint_id: self.checkpoint_id.clone(),
            step_id: self.step_id.clone(),
            prompt: self.prompt.clone(),
        }
    }
}

/// Process-wide table of pending continuations, keyed by checkpoint id.
///
/// Registration and resolution are the only operations; resolution
/// validates against the schema stored at registration time.
#[derive(Clone, Default)]
pub struct CheckpointRegistry {
    inner: Arc<Mutex<HashMap<String, PendingCheckpoint>>>,
}

impl CheckpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh continuation; returns its id and the receiver the
    /// suspended step awaits.
    pub fn register(
        &self,
        run_id: RunId,
        step_id: &str,
        prompt: &str,
        schema: Value,
    ) -> (CheckpointId, oneshot::Receiver<Result<Value, CheckpointError>>) {
        let checkpoint_id = CheckpointId::generate();
        let (tx, rx) = oneshot::channel();
        let pending = PendingCheckpoint {
            checkpoint_id: checkpoint_id.clone(),
            run_id,
            step_id: step_id.to_string(),
            prompt: prompt.to_string(),
            schema,
            tx,
        };
        self.inner.lock().insert(checkpoint_id.as_str().to_string(), pending);
        (checkpoint_id, rx)
    }

    /// Resolve an id (or unambiguous prefix) to its full checkpoint id.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Option<CheckpointId> {
        let inner = self.inner.lock();
        if inner.contains_key(id_or_prefix) {
            return Some(CheckpointId::new(id_or_prefix));
        }
        let mut matches = inner.keys().filter(|key| key.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(key), None) => Some(CheckpointId::new(key.clone())),
            _ => None,
        }
    }

    /// Validate `value` against the stored schema and complete the
    /// continuation. Returns the resolved checkpoint's info.
    pub fn resolve(
        &self,
        id_or_prefix: &str,
        value: Value,
    ) -> Result<CheckpointInfo, CheckpointError> {
        let checkpoint_id = self
            .resolve_id(id_or_prefix)
            .ok_or_else(|| CheckpointError::NotFound(id_or_prefix.to_string()))?;
        let mut inner = self.inner.lock();
        let Some(pending) = inner.get(checkpoint_id.as_str()) else {
            return Err(CheckpointError::NotFound(id_or_prefix.to_string()));
        };
        if let Err(issues) = validate_schema(&pending.schema, &value) {
            return Err(CheckpointError::Invalid { issues });
        }
        // Validation passed; consume the continuation.
        if let Some(pending) = inner.remove(checkpoint_id.as_str()) {
            let info = pending.info();
            let _ = pending.tx.send(Ok(value));
            return Ok(info);
        }
        Err(CheckpointError::NotFound(id_or_prefix.to_string()))
    }

    /// Reject a pending checkpoint.
    pub fn reject(&self, id_or_prefix: &str, reason: &str) -> Result<CheckpointInfo, CheckpointError> {
        let checkpoint_id = self
            .resolve_id(id_or_prefix)
            .ok_or_else(|| CheckpointError::NotFound(id_or_prefix.to_string()))?;
        match self.inner.lock().remove(checkpoint_id.as_str()) {
            Some(pending) => {
                let info = pending.info();
                let _ = pending.tx.send(Err(CheckpointError::Rejected {
                    reason: reason.to_string(),
                }));
                Ok(info)
            }
            None => Err(CheckpointError::NotFound(id_or_prefix.to_string())),
        }
    }

    /// Reject every pending checkpoint belonging to `run_id`; used when a
    /// run reaches a terminal state with suspensions still open.
    pub fn drain_run(&self, run_id: &RunId, reason: &str) -> Vec<CheckpointInfo> {
        let mut inner = self.inner.lock();
        let ids: Vec<String> = inner
            .iter()
            .filter(|(_, pending)| &pending.run_id == run_id)
            .map(|(id, _)| id.clone())
            .collect();
        ids.into_iter()
            .filter_map(|id| inner.remove(&id))
            .map(|pending| {
                let info = pending.info();
                let _ = pending.tx.send(Err(CheckpointError::Rejected {
                    reason: reason.to_string(),
                }));
                info
            })
            .collect()
    }

    pub fn pending_for_run(&self, run_id: &RunId) -> Vec<CheckpointInfo> {
        self.inner
            .lock()
            .values()
            .filter(|pending| &pending.run_id == run_id)
            .map(PendingCheckpoint::info)
            .collect()
    }
}

/// Scripted checkpoint provider for tests: regex-keyed canned values,
/// validated against the step's schema like a real resolution.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct ScriptedCheckpoint {
    rules: Arc<Mutex<Vec<(regex::Regex, Value)>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl ScriptedCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canned value for prompts matching `pattern`.
    ///
    /// Panics on an invalid pattern; scripted providers are test-only.
    #[allow(clippy::panic)]
    pub fn resolve_with(self, pattern: &str, value: Value) -> Self {
        let regex = match regex::Regex::new(pattern) {
            Ok(r) => r,
            Err(e) => panic!("invalid checkpoint pattern {:?}: {}", pattern, e),
        };
        self.rules.lock().push((regex, value));
        self
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl CheckpointProvider for ScriptedCheckpoint {
    async fn prompt(
        &self,
        _step_id: &str,
        message: &str,
        schema: &Value,
    ) -> Result<Value, CheckpointError> {
        let value = {
            let rules = self.rules.lock();
            rules
                .iter()
                .find(|(regex, _)| regex.is_match(message))
                .map(|(_, value)| value.clone())
        };
        let value = value.ok_or_else(|| CheckpointError::Rejected {
            reason: format!("no scripted value matches prompt: {}", message),
        })?;
        if let Err(issues) = validate_schema(schema, &value) {
            return Err(CheckpointError::Invalid { issues });
        }
        Ok(value)
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
