// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-registry checkpoint provider.
//!
//! Each `prompt` registers a oneshot continuation in the process-wide
//! checkpoint registry and mirrors the pending set into the run state,
//! so `GET /runs/:id` can show open checkpoints while the HTTP resolver
//! completes them.

use async_trait::async_trait;
use rb_adapters::{CheckpointError, CheckpointProvider, CheckpointRegistry};
use rb_core::{RunId, RunPatch};
use rb_storage::RunStore;
use serde_json::Value;

/// Checkpoint provider for one run, backed by the shared registry.
#[derive(Clone)]
pub struct RegistryCheckpoint {
    registry: CheckpointRegistry,
    store: RunStore,
    run_id: RunId,
}

impl RegistryCheckpoint {
    pub fn new(registry: CheckpointRegistry, store: RunStore, run_id: RunId) -> Self {
        Self { registry, store, run_id }
    }

    fn mirror_pending(&self) {
        let pending = self.registry.pending_for_run(&self.run_id);
        if let Err(e) = self.store.update(
            &self.run_id,
            RunPatch { pending_checkpoints: Some(pending), ..RunPatch::default() },
        ) {
            tracing::warn!(run_id = %self.run_id, error = %e, "failed to mirror pending checkpoints");
        }
    }
}

#[async_trait]
impl CheckpointProvider for RegistryCheckpoint {
    async fn prompt(
        &self,
        step_id: &str,
        message: &str,
        schema: &Value,
    ) -> Result<Value, CheckpointError> {
        let (checkpoint_id, receiver) =
            self.registry.register(self.run_id.clone(), step_id, message, schema.clone());
        tracing::info!(
            run_id = %self.run_id,
            step_id,
            checkpoint_id = %checkpoint_id,
            "checkpoint registered, suspending"
        );
        self.mirror_pending();

        let result = receiver.await.unwrap_or_else(|_| {
            Err(CheckpointError::Rejected { reason: "checkpoint registry dropped".to_string() })
        });
        self.mirror_pending();
        result
    }
}

#[cfg(test)]
#[path = "checkpoints_tests.rs"]
mod tests;
