// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations.

mod watch;

pub use watch::watch;

use crate::client::Client;
use crate::output;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;

fn parse_json(raw: &str, what: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{} is not valid JSON: {}", what, raw))
}

pub async fn workflows(client: &Client) -> Result<()> {
    let body = client.workflows().await?;
    let workflows = body["workflows"].as_array().cloned().unwrap_or_default();
    if workflows.is_empty() {
        println!("no workflows registered");
        return Ok(());
    }
    for workflow in workflows {
        println!(
            "{:<24} {} steps",
            workflow["id"].as_str().unwrap_or("?"),
            workflow["step_count"].as_u64().unwrap_or(0)
        );
    }
    Ok(())
}

pub async fn run(client: &Client, workflow_id: &str, input: &str) -> Result<()> {
    let input = parse_json(input, "input")?;
    let body = client.submit(workflow_id, input).await?;
    let run_id = body["run_id"].as_str().ok_or_else(|| anyhow!("server omitted run_id"))?;
    println!("{}", run_id);
    Ok(())
}

pub async fn runs(client: &Client) -> Result<()> {
    let body = client.runs().await?;
    let runs = body["runs"].as_array().cloned().unwrap_or_default();
    if runs.is_empty() {
        println!("no runs");
        return Ok(());
    }
    for run in runs {
        println!("{}", output::run_row(&run));
    }
    Ok(())
}

pub async fn status(client: &Client, run_id: &str) -> Result<()> {
    let run = client.run(run_id).await?;
    println!("{}", output::pretty(&run));
    Ok(())
}

pub async fn trace(client: &Client, run_id: &str) -> Result<()> {
    let body = client.trace(run_id).await?;
    let events = body["trace"]["events"].as_array().cloned().unwrap_or_default();
    for event in events {
        println!("{}", output::event_line(&event));
    }
    Ok(())
}

pub async fn cancel(client: &Client, run_id: &str) -> Result<()> {
    client.cancel(run_id).await?;
    println!("cancelled {}", run_id);
    Ok(())
}

pub async fn resolve(
    client: &Client,
    run_id: &str,
    checkpoint_id: &str,
    value: &str,
) -> Result<()> {
    let value = parse_json(value, "value")?;
    client.resolve_checkpoint(run_id, checkpoint_id, value).await?;
    println!("resolved {}", checkpoint_id);
    Ok(())
}

pub async fn resume(client: &Client, workflow_id: &str, run_id: &str) -> Result<()> {
    let body = client.resume(workflow_id, run_id).await?;
    let new_run = body["run_id"].as_str().ok_or_else(|| anyhow!("server omitted run_id"))?;
    println!("{}", new_run);
    Ok(())
}

pub async fn history(
    client: &Client,
    workflow_id: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let body = client.history(workflow_id, limit).await?;
    let runs = body["runs"].as_array().cloned().unwrap_or_default();
    if runs.is_empty() {
        println!("no stored runs");
        return Ok(());
    }
    for run in runs {
        println!(
            "{:<14} {:<20} {}",
            rb_core::short(run["run_id"].as_str().unwrap_or("?"), output::SHORT_ID),
            run["workflow_id"].as_str().unwrap_or("?"),
            run["started_at"].as_str().unwrap_or("-"),
        );
    }
    Ok(())
}
