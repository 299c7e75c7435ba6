// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell provider: subprocess execution with timeout and cancellation.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Errors from shell execution. Each carries the attempted command.
#[derive(Debug, Clone, Error)]
pub enum ShellError {
    #[error("spawn failed for `{command}`: {cause}")]
    Spawn { command: String, cause: String },
    #[error("`{command}` timed out after {timeout_ms}ms")]
    TimedOut { command: String, timeout_ms: u64 },
    #[error("`{command}` aborted")]
    Aborted { command: String },
}

impl ShellError {
    pub fn kind(&self) -> &'static str {
        match self {
            ShellError::Spawn { .. } => "spawn",
            ShellError::TimedOut { .. } => "timed_out",
            ShellError::Aborted { .. } => "aborted",
        }
    }
}

/// Options for one shell invocation.
#[derive(Debug, Clone, Default)]
pub struct ShellOpts {
    pub cwd: Option<PathBuf>,
    /// Appended to the inherited environment.
    pub env: Vec<(String, String)>,
    /// No intrinsic timeout when absent.
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

/// Captured result of a completed command.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Abstraction over subprocess execution.
#[async_trait]
pub trait ShellProvider: Clone + Send + Sync + 'static {
    async fn exec(&self, command: &str, opts: ShellOpts) -> Result<ShellOutput, ShellError>;
}

/// Runs commands through `sh -c`, capturing both streams fully.
///
/// Timeout and cancellation share one termination path: the in-flight
/// child future is dropped, which kills the process (`kill_on_drop`).
#[derive(Debug, Clone, Default)]
pub struct SystemShell;

#[async_trait]
impl ShellProvider for SystemShell {
    async fn exec(&self, command: &str, opts: ShellOpts) -> Result<ShellOutput, ShellError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &opts.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &opts.env {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| ShellError::Spawn {
            command: command.to_string(),
            cause: e.to_string(),
        })?;

        let timeout = async {
            match opts.timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match &opts.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = child.wait_with_output() => {
                let output = result.map_err(|e| ShellError::Spawn {
                    command: command.to_string(),
                    cause: e.to_string(),
                })?;
                let exit_code = output.status.code().unwrap_or(-1);
                tracing::debug!(command, exit_code, "shell command finished");
                Ok(ShellOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code,
                })
            }
            _ = timeout => {
                let timeout_ms = opts.timeout.map(|d| d.as_millis() as u64).unwrap_or(0);
                tracing::warn!(command, timeout_ms, "shell command timed out");
                Err(ShellError::TimedOut { command: command.to_string(), timeout_ms })
            }
            _ = cancelled => {
                tracing::debug!(command, "shell command aborted");
                Err(ShellError::Aborted { command: command.to_string() })
            }
        }
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
