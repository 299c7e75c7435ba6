// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent step execution.
//!
//! Lifecycle per step: compose the system prompt, create a session titled
//! `runbook:<workflow_id>:<step_id>`, subscribe (when supported) and
//! forward live events into the trace, race the prompt against the step
//! timeout, then turn the reply into the step output per the agent mode.

use crate::collector::TraceCollector;
use crate::extract;
use rb_adapters::{AgentEvent, AgentExecutor, PromptReply, SessionConfig, SessionHandle};
use rb_core::{
    schema_to_text, validate_schema, AgentMode, AgentStepOpts, Clock, PromptFn, Step, StepError,
    TraceEvent,
};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) struct AgentDispatch<'a> {
    pub workflow_id: &'a str,
    pub step: &'a Step,
    pub prompt: &'a PromptFn,
    pub mode: AgentMode,
    pub opts: &'a AgentStepOpts,
    pub input: &'a Value,
    pub working_dir: &'a Path,
    pub collector: &'a TraceCollector,
    pub cancel: &'a CancellationToken,
}

pub(crate) async fn execute<Ag: AgentExecutor, C: Clock>(
    agent: &Ag,
    clock: &C,
    d: AgentDispatch<'_>,
) -> Result<Value, StepError> {
    let system_prompt = compose_system_prompt(d.step, d.mode, d.opts, d.working_dir).await?;
    let config = SessionConfig {
        title: format!("runbook:{}:{}", d.workflow_id, d.step.id),
        system_prompt,
        working_dir: d.working_dir.to_path_buf(),
        permissions: d.opts.permissions.clone(),
    };

    let session = agent
        .create_session(config)
        .await
        .map_err(|e| StepError::AgentError { cause: e.to_string() })?;
    d.collector.emit(TraceEvent::AgentSessionCreated {
        ts: clock.epoch_ms(),
        step_id: d.step.id.clone(),
        session_id: session.session_id.clone(),
        title: session.title.clone(),
    });

    // Live events flow into the trace until the step ends.
    let (events_tx, mut events_rx) = mpsc::channel(64);
    let subscription_cancel = CancellationToken::new();
    if agent.subscribe(&session, events_tx, subscription_cancel.clone()) {
        let collector = d.collector.clone();
        let clock = clock.clone();
        let step_id = d.step.id.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                collector.emit(agent_event_to_trace(&step_id, clock.epoch_ms(), event));
            }
        });
    }

    let user_prompt = (d.prompt)(d.input);
    d.collector.emit(TraceEvent::AgentPromptSent {
        ts: clock.epoch_ms(),
        step_id: d.step.id.clone(),
        prompt: user_prompt.clone(),
    });

    let reply = tokio::select! {
        result = agent.prompt(&session, &user_prompt) => {
            result.map_err(|e| StepError::AgentError { cause: e.to_string() })
        }
        _ = tokio::time::sleep(Duration::from_millis(d.opts.timeout_ms)) => {
            // The session is useless after a timeout; reclaim it.
            destroy_in_background(agent, &session);
            Err(StepError::Timeout { timeout_ms: d.opts.timeout_ms })
        }
        _ = d.cancel.cancelled() => {
            // Session intentionally left alive for inspection.
            Err(StepError::Aborted)
        }
    };
    subscription_cancel.cancel();
    let reply = reply?;

    d.collector.emit(TraceEvent::AgentResponse {
        ts: clock.epoch_ms(),
        step_id: d.step.id.clone(),
        response: serde_json::to_value(&reply).unwrap_or(Value::Null),
    });
    destroy_in_background(agent, &session);

    match d.mode {
        AgentMode::Analyze => analyze_output(&reply, &d.step.output_schema),
        AgentMode::Build => Ok(build_output(&reply)),
    }
}

/// Concatenate (in order, skipping empty): system prompt file contents,
/// the inline system prompt, and (analyze mode only) the output-schema
/// instruction block.
async fn compose_system_prompt(
    step: &Step,
    mode: AgentMode,
    opts: &AgentStepOpts,
    working_dir: &Path,
) -> Result<Option<String>, StepError> {
    let mut sections = Vec::new();

    if let Some(path) = &opts.system_prompt_file {
        let resolved = if path.is_relative() { working_dir.join(path) } else { path.clone() };
        let contents = tokio::fs::read_to_string(&resolved).await.map_err(|e| {
            StepError::execution(format!(
                "failed to read system prompt file {}: {}",
                resolved.display(),
                e
            ))
        })?;
        if !contents.trim().is_empty() {
            sections.push(contents);
        }
    }
    if let Some(inline) = &opts.system_prompt {
        if !inline.trim().is_empty() {
            sections.push(inline.clone());
        }
    }
    if mode == AgentMode::Analyze {
        sections.push(format!(
            "Respond with only JSON matching this schema, and nothing else:\n{}",
            schema_to_text(&step.output_schema)
        ));
    }

    Ok(if sections.is_empty() { None } else { Some(sections.join("\n\n")) })
}

/// Analyze mode: extract JSON from the reply text and validate it.
fn analyze_output(reply: &PromptReply, schema: &Value) -> Result<Value, StepError> {
    let Some(value) = extract::extract_json(&reply.text) else {
        return Err(StepError::AgentParseError {
            raw_output: reply.text.clone(),
            issues: vec![],
        });
    };
    match validate_schema(schema, &value) {
        Ok(()) => Ok(value),
        Err(issues) => Err(StepError::AgentParseError { raw_output: reply.text.clone(), issues }),
    }
}

/// Build mode: the reply metadata with `success` defaulted to true.
fn build_output(reply: &PromptReply) -> Value {
    let mut object = match &reply.metadata {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    object.entry("success").or_insert(Value::Bool(true));
    Value::Object(object)
}

fn agent_event_to_trace(step_id: &str, ts: u64, event: AgentEvent) -> TraceEvent {
    match event {
        AgentEvent::TextChunk { text } => {
            TraceEvent::AgentText { ts, step_id: step_id.to_string(), text }
        }
        AgentEvent::ToolCall { name, args } => {
            TraceEvent::AgentToolCall { ts, step_id: step_id.to_string(), tool: name, args }
        }
        AgentEvent::ToolResult { name, result } => {
            TraceEvent::AgentToolResult { ts, step_id: step_id.to_string(), tool: name, result }
        }
    }
}

fn destroy_in_background<Ag: AgentExecutor>(agent: &Ag, session: &SessionHandle) {
    let agent = agent.clone();
    let session = session.clone();
    tokio::spawn(async move {
        if let Err(e) = agent.destroy_session(&session).await {
            tracing::debug!(session_id = %session.session_id, error = %e, "session destroy failed");
        }
    });
}

#[cfg(test)]
#[path = "agent_step_tests.rs"]
mod tests;
