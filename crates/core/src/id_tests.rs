// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_run_ids_are_prefixed_and_unique() {
    let a = RunId::generate();
    let b = RunId::generate();
    assert!(a.as_str().starts_with("run-"));
    assert_ne!(a, b);
}

#[test]
fn generated_checkpoint_ids_are_prefixed() {
    assert!(CheckpointId::generate().as_str().starts_with("ckpt-"));
}

#[yare::parameterized(
    shorter  = { "abc", 8, "abc" },
    exact    = { "abcdefgh", 8, "abcdefgh" },
    truncate = { "abcdefghij", 8, "abcdefgh" },
)]
fn short_truncates(input: &str, n: usize, expected: &str) {
    assert_eq!(short(input, n), expected);
}

#[test]
fn run_id_roundtrips_through_serde() {
    let id = RunId::new("run-0123");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"run-0123\"");
    let parsed: RunId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn ids_compare_against_str() {
    let id = RunId::new("run-42");
    assert_eq!(id, "run-42");
}
