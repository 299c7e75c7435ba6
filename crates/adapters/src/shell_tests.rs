// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Instant;

#[tokio::test]
async fn captures_stdout_stderr_and_exit_code() {
    let out = SystemShell
        .exec("echo out; echo err >&2; exit 3", ShellOpts::default())
        .await
        .unwrap();
    assert_eq!(out.stdout.trim(), "out");
    assert_eq!(out.stderr.trim(), "err");
    assert_eq!(out.exit_code, 3);
}

#[tokio::test]
async fn runs_in_requested_cwd() {
    let dir = tempfile::tempdir().unwrap();
    let out = SystemShell
        .exec("pwd", ShellOpts { cwd: Some(dir.path().to_path_buf()), ..ShellOpts::default() })
        .await
        .unwrap();
    let reported = std::fs::canonicalize(out.stdout.trim()).unwrap();
    assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
}

#[tokio::test]
async fn env_entries_extend_inherited_environment() {
    let out = SystemShell
        .exec(
            "printf %s \"$RB_SHELL_TEST\"",
            ShellOpts { env: vec![("RB_SHELL_TEST".into(), "on".into())], ..ShellOpts::default() },
        )
        .await
        .unwrap();
    assert_eq!(out.stdout, "on");
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let start = Instant::now();
    let err = SystemShell
        .exec(
            "sleep 5",
            ShellOpts { timeout: Some(Duration::from_millis(80)), ..ShellOpts::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ShellError::TimedOut { timeout_ms: 80, .. }));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn cancellation_maps_to_aborted() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let err = SystemShell
        .exec("sleep 5", ShellOpts { cancel: Some(token), ..ShellOpts::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ShellError::Aborted { .. }));
}

#[tokio::test]
async fn unspawnable_command_is_a_spawn_error() {
    // sh itself spawns; a bad cwd makes the spawn fail
    let err = SystemShell
        .exec(
            "true",
            ShellOpts { cwd: Some(PathBuf::from("/definitely/not/here")), ..ShellOpts::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ShellError::Spawn { .. }));
}
