// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trace collector: ordered event log with synchronous listener fan-out.
//!
//! Owned by one engine invocation. `emit` appends the event and then
//! invokes every listener in registration order; listeners see a shared
//! reference and must not block. Ordering is the total order of `emit`
//! calls within the invocation.

use parking_lot::Mutex;
use rb_core::{RunId, Trace, TraceEvent, TraceSink, TraceStatus};
use std::sync::Arc;

/// Callback invoked synchronously for every emitted event.
pub type TraceListener = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

struct Inner {
    events: Vec<TraceEvent>,
    listeners: Vec<TraceListener>,
}

/// Append-only event sequence for one run.
#[derive(Clone)]
pub struct TraceCollector {
    run_id: RunId,
    workflow_id: String,
    inner: Arc<Mutex<Inner>>,
}

impl TraceCollector {
    pub fn new(run_id: RunId, workflow_id: impl Into<String>) -> Self {
        Self {
            run_id,
            workflow_id: workflow_id.into(),
            inner: Arc::new(Mutex::new(Inner { events: Vec::new(), listeners: Vec::new() })),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Register a listener; it sees every event emitted after this call.
    pub fn on_event(&self, listener: TraceListener) {
        self.inner.lock().listeners.push(listener);
    }

    /// Append and fan out. Listeners run outside the lock so they may
    /// call back into the collector (e.g. `snapshot`).
    pub fn emit(&self, event: TraceEvent) {
        let listeners = {
            let mut inner = self.inner.lock();
            inner.events.push(event.clone());
            inner.listeners.clone()
        };
        for listener in &listeners {
            listener(&event);
        }
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.inner.lock().events.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().events.is_empty()
    }

    /// Cloneable sink for step contexts and subscription forwarders.
    pub fn sink(&self) -> TraceSink {
        let collector = self.clone();
        TraceSink::new(move |event| collector.emit(event))
    }

    /// Shallow-copied immutable trace.
    pub fn snapshot(&self, status: TraceStatus, duration_ms: u64) -> Trace {
        Trace {
            run_id: self.run_id.clone(),
            workflow_id: self.workflow_id.clone(),
            events: self.events(),
            status,
            duration_ms,
        }
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
