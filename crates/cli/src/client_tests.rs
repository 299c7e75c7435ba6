// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn url_building_trims_trailing_slash() {
    let client = Client::new("http://localhost:4400/");
    assert_eq!(client.url("/runs"), "http://localhost:4400/runs");
}

#[yare::parameterized(
    none     = { None, None, "/runs/history" },
    workflow = { Some("wf"), None, "/runs/history?workflow_id=wf" },
    limit    = { None, Some(5), "/runs/history?limit=5" },
    both     = { Some("wf"), Some(5), "/runs/history?workflow_id=wf&limit=5" },
)]
fn history_query_building(workflow_id: Option<&str>, limit: Option<usize>, expected: &str) {
    assert_eq!(history_path(workflow_id, limit), expected);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let client = Client::new("http://127.0.0.1:1");
    let err = client.health().await.unwrap_err();
    assert_eq!(err.kind(), "transport");
}
