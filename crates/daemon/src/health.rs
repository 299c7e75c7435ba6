// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup health check with exponential backoff.

use rb_adapters::{AgentExecutor, AgentExecutorError};
use std::time::Duration;

const BACKOFF_BASE: Duration = Duration::from_millis(500);
pub const DEFAULT_HEALTH_ATTEMPTS: u32 = 3;

/// Probe the agent provider until it answers, backing off 500 ms × 3^(n-1)
/// between attempts. The caller terminates the server when this fails.
pub async fn wait_for_agent<Ag: AgentExecutor>(
    agent: &Ag,
    attempts: u32,
) -> Result<(), AgentExecutorError> {
    let mut delay = BACKOFF_BASE;
    let mut last_error = AgentExecutorError::Unhealthy("no health check attempts made".to_string());

    for attempt in 1..=attempts.max(1) {
        if attempt > 1 {
            tokio::time::sleep(delay).await;
            delay *= 3;
        }
        match agent.health_check().await {
            Ok(()) => {
                tracing::info!(attempt, "agent service healthy");
                return Ok(());
            }
            Err(error) => {
                tracing::warn!(attempt, error = %error, "agent health check failed");
                last_error = error;
            }
        }
    }
    Err(last_error)
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
