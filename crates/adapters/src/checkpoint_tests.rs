// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn approval_schema() -> Value {
    json!({"type": "object", "properties": {"approved": {"type": "boolean"}}, "required": ["approved"]})
}

#[tokio::test]
async fn register_then_resolve_completes_the_continuation() {
    let registry = CheckpointRegistry::new();
    let run_id = RunId::new("run-1");
    let (id, rx) = registry.register(run_id, "approval", "ship it?", approval_schema());

    let info = registry.resolve(id.as_str(), json!({"approved": true})).unwrap();
    assert_eq!(info.step_id, "approval");
    assert_eq!(rx.await.unwrap().unwrap(), json!({"approved": true}));
}

#[tokio::test]
async fn resolve_validates_against_stored_schema() {
    let registry = CheckpointRegistry::new();
    let (id, rx) = registry.register(RunId::new("run-1"), "approval", "ship?", approval_schema());

    let err = registry.resolve(id.as_str(), json!({"approved": "yes"})).unwrap_err();
    assert!(matches!(err, CheckpointError::Invalid { .. }));
    // Continuation stays pending after an invalid attempt.
    assert!(registry.resolve(id.as_str(), json!({"approved": false})).is_ok());
    assert_eq!(rx.await.unwrap().unwrap(), json!({"approved": false}));
}

#[tokio::test]
async fn resolve_accepts_unambiguous_prefix() {
    let registry = CheckpointRegistry::new();
    let (id, rx) = registry.register(RunId::new("run-1"), "approval", "ok?", json!(true));
    let prefix = &id.as_str()[..12];
    registry.resolve(prefix, json!(1)).unwrap();
    assert!(rx.await.unwrap().is_ok());
}

#[test]
fn unknown_id_is_not_found() {
    let registry = CheckpointRegistry::new();
    assert!(matches!(
        registry.resolve("ckpt-nope", json!(1)),
        Err(CheckpointError::NotFound(_))
    ));
}

#[tokio::test]
async fn reject_delivers_the_reason() {
    let registry = CheckpointRegistry::new();
    let (id, rx) = registry.register(RunId::new("run-1"), "approval", "ok?", json!(true));
    registry.reject(id.as_str(), "operator declined").unwrap();
    let err = rx.await.unwrap().unwrap_err();
    assert!(matches!(err, CheckpointError::Rejected { reason } if reason == "operator declined"));
}

#[tokio::test]
async fn drain_run_rejects_only_that_runs_checkpoints() {
    let registry = CheckpointRegistry::new();
    let (_, rx_a) = registry.register(RunId::new("run-a"), "s1", "p", json!(true));
    let (id_b, _rx_b) = registry.register(RunId::new("run-b"), "s2", "p", json!(true));

    let drained = registry.drain_run(&RunId::new("run-a"), "run ended");
    assert_eq!(drained.len(), 1);
    assert!(rx_a.await.unwrap().is_err());
    assert_eq!(registry.pending_for_run(&RunId::new("run-b")).len(), 1);
    assert!(registry.resolve_id(id_b.as_str()).is_some());
}

#[tokio::test]
async fn scripted_checkpoint_matches_and_validates() {
    let provider = ScriptedCheckpoint::new()
        .resolve_with("deploy", json!({"approved": true}))
        .resolve_with(".*", json!({"approved": false}));

    let value = provider.prompt("approval", "approve deploy?", &approval_schema()).await.unwrap();
    assert_eq!(value, json!({"approved": true}));

    let fallback = provider.prompt("approval", "other", &approval_schema()).await.unwrap();
    assert_eq!(fallback, json!({"approved": false}));
}

#[tokio::test]
async fn scripted_checkpoint_rejects_unmatched_prompts() {
    let provider = ScriptedCheckpoint::new();
    let err = provider.prompt("s", "anything", &json!(true)).await.unwrap_err();
    assert!(matches!(err, CheckpointError::Rejected { .. }));
}

#[tokio::test]
async fn scripted_checkpoint_flags_schema_mismatch() {
    let provider = ScriptedCheckpoint::new().resolve_with(".*", json!("nope"));
    let err = provider.prompt("s", "go", &approval_schema()).await.unwrap_err();
    assert!(matches!(err, CheckpointError::Invalid { .. }));
}
