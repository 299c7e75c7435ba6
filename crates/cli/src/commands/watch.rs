// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tail a run's SSE event stream.

use crate::client::Client;
use crate::output;
use anyhow::Result;
use futures_util::StreamExt;

/// Stream events for a run until the stream ends (terminal state) or the
/// connection drops.
pub async fn watch(client: &Client, run_id: &str) -> Result<()> {
    let response = client.events(run_id).await?;
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        // SSE frames are newline-delimited; print complete data lines.
        while let Some(newline) = buffer.find('\n') {
            let line: String = buffer.drain(..=newline).collect();
            let line = line.trim_end();
            if let Some(payload) = line.strip_prefix("data: ") {
                match serde_json::from_str(payload) {
                    Ok(event) => println!("{}", output::event_line(&event)),
                    Err(_) => println!("{}", payload),
                }
            }
        }
    }
    Ok(())
}
