// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb-daemon: Workflow router and HTTP control plane.
//!
//! The router accepts run submissions, spawns engine invocations
//! asynchronously, wires cancellation and checkpoint resolution into the
//! run store, and mirrors trace events (plus optional artifact writes)
//! as they land. The HTTP layer is a thin axum adapter over it.

pub mod builtin;
pub mod checkpoints;
pub mod health;
pub mod http;
pub mod router;

pub use checkpoints::RegistryCheckpoint;
pub use health::wait_for_agent;
pub use router::{Router, RouterError, WorkflowRegistry};
