// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rbd: the runbook workflow daemon.

use clap::Parser;
use rb_adapters::{RemoteAgent, RemoteAgentConfig, SystemShell};
use rb_daemon::{builtin, health, http, Router, WorkflowRegistry};
use rb_storage::GitStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "rbd", about = "Runbook workflow daemon")]
struct Args {
    /// Control-plane bind address.
    #[arg(long, env = "RUNBOOK_BIND", default_value = "127.0.0.1:4400")]
    bind: String,

    /// Agent service base URL.
    #[arg(long, env = "RUNBOOK_AGENT_URL", default_value = rb_adapters::agent::remote::DEFAULT_AGENT_URL)]
    agent_url: String,

    /// Repository holding the artifact store (and run working dir).
    #[arg(long, env = "RUNBOOK_REPO", default_value = ".")]
    repo_dir: PathBuf,

    /// Agent stall budget in milliseconds.
    #[arg(long, env = "RUNBOOK_STALE_TIMEOUT_MS", default_value_t = 180_000)]
    stale_timeout_ms: u64,

    /// Disable artifact persistence.
    #[arg(long, env = "RUNBOOK_NO_ARTIFACTS")]
    no_artifacts: bool,

    /// Startup health-check attempts against the agent service.
    #[arg(long, env = "RUNBOOK_HEALTH_ATTEMPTS", default_value_t = health::DEFAULT_HEALTH_ATTEMPTS)]
    health_attempts: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let agent = RemoteAgent::new(RemoteAgentConfig {
        base_url: args.agent_url.clone(),
        stale_timeout: Duration::from_millis(args.stale_timeout_ms),
        ..RemoteAgentConfig::default()
    });

    if let Err(error) = health::wait_for_agent(&agent, args.health_attempts).await {
        tracing::error!(agent_url = %args.agent_url, %error, "agent service unreachable, exiting");
        return ExitCode::FAILURE;
    }

    let artifacts =
        if args.no_artifacts { None } else { Some(GitStore::new(args.repo_dir.clone())) };

    let mut registry = WorkflowRegistry::new();
    for workflow in builtin::workflows() {
        registry = registry.register(workflow);
    }
    let router = Router::new(registry, SystemShell, agent, artifacts, args.repo_dir);

    let listener = match tokio::net::TcpListener::bind(&args.bind).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(bind = %args.bind, %error, "failed to bind control plane");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(bind = %args.bind, "control plane listening");

    match http::serve(listener, router).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "server exited with error");
            ExitCode::FAILURE
        }
    }
}
