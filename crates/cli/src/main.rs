// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rb: CLI client for the runbook workflow daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use client::Client;

#[derive(Debug, Parser)]
#[command(name = "rb", about = "Runbook workflow client", version)]
struct Cli {
    /// Server URL.
    #[arg(long, env = "RUNBOOK_URL", default_value = client::DEFAULT_SERVER_URL)]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered workflows.
    Workflows,
    /// Submit a run; prints the run id.
    Run {
        workflow_id: String,
        /// Workflow input as JSON.
        input: String,
    },
    /// List runs, newest first.
    Runs,
    /// Show one run.
    Status { run_id: String },
    /// Print a run's trace.
    Trace { run_id: String },
    /// Stream a run's events until it settles.
    Watch { run_id: String },
    /// Cancel an in-flight run.
    Cancel { run_id: String },
    /// Resolve a pending checkpoint with a JSON value.
    Resolve {
        run_id: String,
        checkpoint_id: String,
        /// Checkpoint value as JSON.
        value: String,
    },
    /// Resume a checkpointed run as a new run; prints the new run id.
    Resume { workflow_id: String, run_id: String },
    /// List persisted runs from the artifact store.
    History {
        #[arg(long)]
        workflow_id: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new(cli.url);

    match cli.command {
        Command::Workflows => commands::workflows(&client).await,
        Command::Run { workflow_id, input } => commands::run(&client, &workflow_id, &input).await,
        Command::Runs => commands::runs(&client).await,
        Command::Status { run_id } => commands::status(&client, &run_id).await,
        Command::Trace { run_id } => commands::trace(&client, &run_id).await,
        Command::Watch { run_id } => commands::watch(&client, &run_id).await,
        Command::Cancel { run_id } => commands::cancel(&client, &run_id).await,
        Command::Resolve { run_id, checkpoint_id, value } => {
            commands::resolve(&client, &run_id, &checkpoint_id, &value).await
        }
        Command::Resume { workflow_id, run_id } => {
            commands::resume(&client, &workflow_id, &run_id).await
        }
        Command::History { workflow_id, limit } => {
            commands::history(&client, workflow_id.as_deref(), limit).await
        }
    }
}
