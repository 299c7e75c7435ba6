// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rb_core::RunState;
use serde_json::json;

fn setup(run: &str) -> (CheckpointRegistry, RunStore, RegistryCheckpoint) {
    let registry = CheckpointRegistry::new();
    let store = RunStore::new();
    store.create(RunState::new(RunId::new(run), "wf", json!(null), 0));
    let provider = RegistryCheckpoint::new(registry.clone(), store.clone(), RunId::new(run));
    (registry, store, provider)
}

#[tokio::test]
async fn prompt_registers_and_mirrors_into_run_state() {
    let (registry, store, provider) = setup("run-1");

    let task = tokio::spawn(async move {
        provider.prompt("approval", "ship it?", &json!(true)).await
    });

    // Wait for registration to land.
    let pending = loop {
        let pending = registry.pending_for_run(&RunId::new("run-1"));
        if !pending.is_empty() {
            break pending;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    };
    assert_eq!(pending[0].step_id, "approval");
    assert_eq!(store.get("run-1").unwrap().pending_checkpoints.len(), 1);

    registry.resolve(pending[0].checkpoint_id.as_str(), json!(true)).unwrap();
    let value = task.await.unwrap().unwrap();
    assert_eq!(value, json!(true));

    // Resolution clears the mirror.
    assert!(store.get("run-1").unwrap().pending_checkpoints.is_empty());
}

#[tokio::test]
async fn rejection_propagates_reason() {
    let (registry, _store, provider) = setup("run-1");

    let task = tokio::spawn(async move {
        provider.prompt("approval", "ship it?", &json!(true)).await
    });
    let pending = loop {
        let pending = registry.pending_for_run(&RunId::new("run-1"));
        if !pending.is_empty() {
            break pending;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    };

    registry.reject(pending[0].checkpoint_id.as_str(), "nope").unwrap();
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, CheckpointError::Rejected { reason } if reason == "nope"));
}
