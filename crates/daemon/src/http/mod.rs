// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP control plane (axum).
//!
//! Thin adapter over the router: every handler validates, delegates, and
//! maps `RouterError` onto a status code. Run and checkpoint ids accept
//! unambiguous prefixes throughout.

mod error;
mod events;
mod runs;
mod workflows;

pub use error::ApiError;

use crate::router::Router;
use axum::routing::{get, post};
use rb_adapters::{AgentExecutor, ShellProvider};

/// Build the control-plane app over a router.
pub fn app<Sh, Ag>(router: Router<Sh, Ag>) -> axum::Router
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    axum::Router::new()
        .route("/health", get(health))
        .route("/workflows", get(workflows::list::<Sh, Ag>))
        .route("/workflows/{id}/run", post(workflows::submit::<Sh, Ag>))
        .route("/workflows/{id}/resume/{run_id}", post(workflows::resume::<Sh, Ag>))
        .route("/runs", get(runs::list::<Sh, Ag>))
        .route("/runs/history", get(runs::history::<Sh, Ag>))
        .route("/runs/{id}", get(runs::get_run::<Sh, Ag>))
        .route("/runs/{id}/trace", get(runs::get_trace::<Sh, Ag>))
        .route("/runs/{id}/events", get(events::stream::<Sh, Ag>))
        .route("/runs/{id}/cancel", post(runs::cancel::<Sh, Ag>))
        .route("/runs/{id}/checkpoints/{checkpoint_id}", post(runs::resolve_checkpoint::<Sh, Ag>))
        .with_state(router)
}

/// Serve until the listener fails; callers own binding so tests can use
/// an ephemeral port.
pub async fn serve<Sh, Ag>(
    listener: tokio::net::TcpListener,
    router: Router<Sh, Ag>,
) -> std::io::Result<()>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    axum::serve(listener, app(router)).await
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"status": "ok"}))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
