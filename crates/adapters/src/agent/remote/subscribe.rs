// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling subscription: translates message parts into agent events.
//!
//! The service has no push channel for engine consumers, so the
//! subscription polls messages across the session tree, deduplicates
//! parts by `(part_id, phase)`, and forwards fresh ones as events.

use super::client::{AgentServiceClient, Part};
use super::monitor::session_tree;
use crate::agent::AgentEvent;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Translate a message part into an event, if it carries one.
pub(crate) fn part_to_event(part: &Part) -> Option<AgentEvent> {
    if part.is_text() {
        let text = part.text.clone()?;
        return Some(AgentEvent::TextChunk { text });
    }
    if part.is_tool() {
        let name = part.tool.clone()?;
        return match &part.result {
            Some(result) => Some(AgentEvent::ToolResult { name, result: result.clone() }),
            None => Some(AgentEvent::ToolCall {
                name,
                args: part.args.clone().unwrap_or(Value::Null),
            }),
        };
    }
    None
}

/// Dedup key: tool parts re-appear when their phase advances, and the
/// phase transition is itself an event worth forwarding.
pub(crate) fn part_key(part: &Part) -> (String, String) {
    (part.id.clone(), part.phase.clone().unwrap_or_default())
}

/// Poll messages for `session_id` and its children until `cancel` fires,
/// forwarding fresh parts as events. Ends early if the receiver is gone.
pub(crate) async fn poll_events(
    client: AgentServiceClient,
    session_id: String,
    interval: Duration,
    events: mpsc::Sender<AgentEvent>,
    cancel: CancellationToken,
) {
    let mut seen: HashSet<(String, String)> = HashSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let tree_ids: Vec<String> = match client.list_sessions().await {
            Ok(sessions) => match session_tree(sessions, &session_id) {
                Some((parent, children)) => std::iter::once(parent.id)
                    .chain(children.into_iter().map(|c| c.id))
                    .collect(),
                None => continue,
            },
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "subscribe poll failed");
                continue;
            }
        };

        for id in tree_ids {
            let messages = match client.messages(&id).await {
                Ok(messages) => messages,
                Err(_) => continue,
            };
            for message in messages {
                for part in message.parts {
                    if !seen.insert(part_key(&part)) {
                        continue;
                    }
                    if let Some(event) = part_to_event(&part) {
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "subscribe_tests.rs"]
mod tests;
