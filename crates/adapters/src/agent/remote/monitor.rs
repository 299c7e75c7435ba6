// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stall detection for remote agent sessions.
//!
//! The agent service never signals inactivity itself: a session stuck on
//! a permission approval or a dead subagent just stays "busy" or idle
//! forever. The monitor is an independent poller that observes the
//! session tree and pending permissions, and aborts the session once no
//! forward progress has happened within the stale timeout.

use super::client::{AgentServiceClient, PermissionInfo, QuestionInfo, SessionInfo};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Observed state of one session tree at a poll tick.
#[derive(Debug, Clone)]
pub(crate) struct TreeObservation {
    pub parent: SessionInfo,
    pub children: Vec<SessionInfo>,
    pub pending_permissions: Vec<PermissionInfo>,
}

/// What a poll tick concluded about forward progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdleDecision {
    /// Session is working and nothing blocks it; restart the idle clock.
    Active,
    /// No forward progress; the idle clock runs from this update time.
    IdleSince(u64),
}

/// Classify a tree observation.
///
/// Busy with no pending permissions means real work is happening. A busy
/// session *with* pending permissions is the classic stall: the service
/// reports activity but is actually parked on an approval that will never
/// arrive, so it gets the idle treatment.
pub(crate) fn classify(observation: &TreeObservation) -> IdleDecision {
    let busy =
        observation.parent.busy || observation.children.iter().any(|child| child.busy);
    if busy && observation.pending_permissions.is_empty() {
        return IdleDecision::Active;
    }
    let last_update = observation
        .children
        .iter()
        .map(|child| child.time.updated)
        .chain(std::iter::once(observation.parent.time.updated))
        .max()
        .unwrap_or(observation.parent.time.updated);
    IdleDecision::IdleSince(last_update)
}

/// Select the session and its children from a full session listing.
pub(crate) fn session_tree(
    all: Vec<SessionInfo>,
    session_id: &str,
) -> Option<(SessionInfo, Vec<SessionInfo>)> {
    let parent = all.iter().find(|s| s.id == session_id)?.clone();
    let children = all
        .into_iter()
        .filter(|s| s.parent_id.as_deref() == Some(session_id))
        .collect();
    Some((parent, children))
}

/// Snapshot recorded when a session is declared stalled. The description
/// references the pending-permission path so an operator can attach.
#[derive(Debug, Clone)]
pub struct ActivitySummary {
    pub session_id: String,
    pub parent_title: String,
    pub child_sessions: Vec<(String, String)>,
    pub pending_permission: Option<PermissionInfo>,
    pub idle_ms: u64,
}

impl ActivitySummary {
    pub fn describe(&self) -> String {
        let mut parts = vec![format!(
            "session {} ({:?}) made no progress for {}ms",
            self.session_id, self.parent_title, self.idle_ms
        )];
        if !self.child_sessions.is_empty() {
            let children: Vec<String> = self
                .child_sessions
                .iter()
                .map(|(id, title)| format!("{} ({:?})", id, title))
                .collect();
            parts.push(format!("children: {}", children.join(", ")));
        }
        if let Some(permission) = &self.pending_permission {
            parts.push(format!(
                "blocked on permission {} (session {}); attach to the session to approve or deny",
                permission.id, permission.session_id
            ));
        }
        parts.join("; ")
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Poll one session tree until the prompt finishes (`cancel`) or the tree
/// stalls. On stall: abort the session (never destroy it, so operators can
/// inspect), then report through `stall_tx`.
pub(crate) async fn run_monitor(
    client: AgentServiceClient,
    session_id: String,
    stale_timeout: Duration,
    poll_interval: Duration,
    cancel: CancellationToken,
    stall_tx: oneshot::Sender<ActivitySummary>,
) {
    let stale_ms = stale_timeout.as_millis() as u64;
    // Activity floor: a session that starts idle still gets the full
    // timeout from monitor start.
    let mut activity_floor = now_ms();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(poll_interval) => {}
        }

        let observation = match observe(&client, &session_id).await {
            Some(observation) => observation,
            // Transient listing errors don't count as progress or stall.
            None => continue,
        };
        // The prompt may have completed while we were polling.
        if cancel.is_cancelled() {
            return;
        }

        match classify(&observation) {
            IdleDecision::Active => {
                activity_floor = now_ms();
            }
            IdleDecision::IdleSince(updated) => {
                let last_activity = updated.max(activity_floor);
                let idle_ms = now_ms().saturating_sub(last_activity);
                if idle_ms >= stale_ms {
                    let summary = ActivitySummary {
                        session_id: session_id.clone(),
                        parent_title: observation.parent.title.clone(),
                        child_sessions: observation
                            .children
                            .iter()
                            .map(|child| (child.id.clone(), child.title.clone()))
                            .collect(),
                        pending_permission: observation.pending_permissions.first().cloned(),
                        idle_ms,
                    };
                    tracing::warn!(
                        session_id = %session_id,
                        idle_ms,
                        "agent session stalled, aborting"
                    );
                    if let Err(e) = client.abort_session(&session_id).await {
                        tracing::warn!(session_id = %session_id, error = %e, "abort failed");
                    }
                    let _ = stall_tx.send(summary);
                    return;
                }
            }
        }
    }
}

/// One poll tick: list the tree, auto-reject pending questions, gather
/// pending permissions.
async fn observe(client: &AgentServiceClient, session_id: &str) -> Option<TreeObservation> {
    let sessions = match client.list_sessions().await {
        Ok(sessions) => sessions,
        Err(e) => {
            tracing::debug!(session_id, error = %e, "session list failed");
            return None;
        }
    };
    let (parent, children) = session_tree(sessions, session_id)?;

    let mut pending_permissions = Vec::new();
    let mut pending_questions: Vec<QuestionInfo> = Vec::new();
    for id in std::iter::once(parent.id.as_str()).chain(children.iter().map(|c| c.id.as_str())) {
        if let Ok(mut permissions) = client.permissions(id).await {
            pending_permissions.append(&mut permissions);
        }
        if let Ok(mut questions) = client.questions(id).await {
            pending_questions.append(&mut questions);
        }
    }

    // Runs are non-interactive; human input arrives through checkpoint
    // steps, never through agent questions.
    for question in pending_questions {
        tracing::info!(
            session_id = %question.session_id,
            question_id = %question.id,
            "auto-rejecting agent question"
        );
        if let Err(e) = client.reject_question(&question.id).await {
            tracing::debug!(question_id = %question.id, error = %e, "question reject failed");
        }
    }

    Some(TreeObservation { parent, children, pending_permissions })
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
