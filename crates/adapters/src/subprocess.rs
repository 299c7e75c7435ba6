// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Default timeout for git plumbing commands (hash-object, mktree, refs).
pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for git network operations (push/fetch).
pub const GIT_SYNC_TIMEOUT: Duration = Duration::from_secs(120);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

/// Run a subprocess with bytes piped to stdin and a timeout.
///
/// Used by the git plumbing (`hash-object --stdin`, `mktree`) where the
/// payload arrives on stdin rather than as arguments.
pub async fn run_with_input(
    mut cmd: Command,
    input: &[u8],
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let run = async {
        let mut child = cmd
            .spawn()
            .map_err(|e| format!("{} failed to spawn: {}", description, e))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .await
                .map_err(|e| format!("{} stdin write failed: {}", description, e))?;
            // Close stdin so the child sees EOF.
            drop(stdin);
        }
        child
            .wait_with_output()
            .await
            .map_err(|e| format!("{} failed: {}", description, e))
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(result) => result,
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
