// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory run state store.
//!
//! Insertion-ordered map of `run_id → RunState` plus the per-run
//! cancellation token and the live-event tap SSE subscribers read from.
//! `update`/`append_events` are the only mutation surfaces; lookups
//! accept an unambiguous id prefix for CLI convenience.

use indexmap::IndexMap;
use parking_lot::Mutex;
use rb_core::{RunId, RunPatch, RunState, TraceEvent};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of each run's live-event tap. SSE consumers that lag past
/// this many events miss the overwritten ones (broadcast semantics).
const EVENT_TAP_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown run: {0}")]
    UnknownRun(String),
}

#[derive(Default)]
struct StoreInner {
    runs: IndexMap<String, RunState>,
    cancels: HashMap<String, CancellationToken>,
    taps: HashMap<String, broadcast::Sender<(usize, TraceEvent)>>,
}

/// Shared handle to the process-wide run table.
#[derive(Clone, Default)]
pub struct RunStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run; returns its cancellation token.
    pub fn create(&self, state: RunState) -> CancellationToken {
        let token = CancellationToken::new();
        let (tap, _) = broadcast::channel(EVENT_TAP_CAPACITY);
        let run_id = state.run_id.as_str().to_string();
        let mut inner = self.inner.lock();
        inner.cancels.insert(run_id.clone(), token.clone());
        inner.taps.insert(run_id.clone(), tap);
        inner.runs.insert(run_id, state);
        token
    }

    /// Resolve an id or unambiguous prefix to the full run id. Exact
    /// matches win; a prefix matches iff exactly one key starts with it.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Option<RunId> {
        let inner = self.inner.lock();
        if inner.runs.contains_key(id_or_prefix) {
            return Some(RunId::new(id_or_prefix));
        }
        let mut matches = inner.runs.keys().filter(|key| key.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(key), None) => Some(RunId::new(key.clone())),
            _ => None,
        }
    }

    pub fn get(&self, id_or_prefix: &str) -> Option<RunState> {
        let run_id = self.resolve_id(id_or_prefix)?;
        self.inner.lock().runs.get(run_id.as_str()).cloned()
    }

    /// All runs in insertion order.
    pub fn list(&self) -> Vec<RunState> {
        self.inner.lock().runs.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().runs.is_empty()
    }

    /// Shallow-merge a patch into a run. Status reversals are ignored
    /// and logged rather than applied.
    pub fn update(&self, run_id: &RunId, patch: RunPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let state = inner
            .runs
            .get_mut(run_id.as_str())
            .ok_or_else(|| StoreError::UnknownRun(run_id.as_str().to_string()))?;
        if !state.apply(patch) {
            tracing::warn!(run_id = %run_id, status = %state.status, "ignored status reversal");
        }
        Ok(())
    }

    /// Append trace events and fan them out to live subscribers.
    pub fn append_events(&self, run_id: &RunId, events: &[TraceEvent]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let state = inner
            .runs
            .get_mut(run_id.as_str())
            .ok_or_else(|| StoreError::UnknownRun(run_id.as_str().to_string()))?;
        let mut seq = state.trace_events.len();
        state.trace_events.extend_from_slice(events);
        if let Some(tap) = inner.taps.get(run_id.as_str()) {
            for event in events {
                // Send errors just mean no subscriber is listening.
                let _ = tap.send((seq, event.clone()));
                seq += 1;
            }
        }
        Ok(())
    }

    pub fn cancel_token(&self, run_id: &RunId) -> Option<CancellationToken> {
        self.inner.lock().cancels.get(run_id.as_str()).cloned()
    }

    /// Atomically snapshot a run and subscribe to its live events. The
    /// receiver is `None` once the run is terminal (tap dropped).
    #[allow(clippy::type_complexity)]
    pub fn subscribe(
        &self,
        id_or_prefix: &str,
    ) -> Option<(RunState, Option<broadcast::Receiver<(usize, TraceEvent)>>)> {
        let run_id = self.resolve_id(id_or_prefix)?;
        let inner = self.inner.lock();
        let state = inner.runs.get(run_id.as_str())?.clone();
        let receiver = inner.taps.get(run_id.as_str()).map(|tap| tap.subscribe());
        Some((state, receiver))
    }

    /// Terminal transition: apply the patch, then drop the cancellation
    /// token and the event tap (ending live subscriptions).
    pub fn finish(&self, run_id: &RunId, patch: RunPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let state = inner
            .runs
            .get_mut(run_id.as_str())
            .ok_or_else(|| StoreError::UnknownRun(run_id.as_str().to_string()))?;
        if !state.apply(patch) {
            tracing::warn!(run_id = %run_id, status = %state.status, "ignored status reversal at finish");
        }
        inner.cancels.remove(run_id.as_str());
        inner.taps.remove(run_id.as_str());
        Ok(())
    }
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
