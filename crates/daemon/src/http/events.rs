// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-Sent-Events stream of a run's trace.
//!
//! Replays the snapshot first, then forwards live events; sequence
//! numbers dedupe the handover. The stream ends when the run reaches a
//! terminal state (its event tap is dropped).

use super::error::ApiError;
use crate::router::Router;
use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use rb_adapters::{AgentExecutor, ShellProvider};
use rb_core::TraceEvent;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

fn sse_event(event: &TraceEvent) -> SseEvent {
    SseEvent::default()
        .event(event.kind())
        .data(serde_json::to_string(event).unwrap_or_default())
}

/// GET /runs/:id/events
pub(super) async fn stream<Sh, Ag>(
    State(router): State<Router<Sh, Ag>>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError>
where
    Sh: ShellProvider,
    Ag: AgentExecutor,
{
    let (state, receiver) = router
        .store()
        .subscribe(&id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown run: {}", id)))?;

    let snapshot_len = state.trace_events.len();
    let replay = stream::iter(
        state
            .trace_events
            .into_iter()
            .map(|event| Ok(sse_event(&event)))
            .collect::<Vec<_>>(),
    );

    let live = match receiver {
        Some(receiver) => BroadcastStream::new(receiver)
            .filter_map(move |item| async move {
                match item {
                    // Events already covered by the snapshot are dropped.
                    Ok((seq, event)) if seq >= snapshot_len => Some(Ok(sse_event(&event))),
                    Ok(_) => None,
                    // A lagged subscriber misses events rather than erroring.
                    Err(_) => None,
                }
            })
            .left_stream(),
        None => stream::empty().right_stream(),
    };

    Ok(Sse::new(replay.chain(live)).keep_alive(KeepAlive::default()))
}
