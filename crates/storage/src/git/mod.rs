// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git-backed artifact store.
//!
//! Each run persists as an immutable tree under
//! `refs/runbook/runs/<run_id>`:
//!
//! ```text
//! <run-tree>
//! ├── trace.json           canonical JSON serialization of the trace
//! ├── metadata.json        workflow id, input/output, timings, commit link
//! └── steps/<step_id>/     per step (optional)
//!     ├── input.json
//!     ├── output.json
//!     ├── prompt.txt       agent steps
//!     ├── response.json
//!     └── iterations.json
//! ```
//!
//! The ref is updated, never committed: the tree is reachable through the
//! ref but absent from history. Writes are a side effect of the router;
//! the engine never blocks on this store nor depends on its success.

mod plumbing;

use plumbing::{Git, TreeEntry};
use rb_core::{RunId, Trace, TraceEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Private ref namespace holding run trees.
pub const RUNS_REF_NAMESPACE: &str = "refs/runbook/runs";

const DEFAULT_REMOTE: &str = "origin";

#[derive(Debug, Error)]
pub enum GitStoreError {
    #[error("git {op} failed: {cause}")]
    Command { op: String, cause: String },
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("no artifacts for step `{step_id}` of run {run_id}")]
    StepNotFound { run_id: String, step_id: String },
    #[error("invalid artifact data: {0}")]
    Invalid(String),
}

/// Explicit per-step artifacts; overlaid on what the trace synthesizes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepArtifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<Value>,
}

impl StepArtifacts {
    fn is_empty(&self) -> bool {
        self.input.is_none()
            && self.output.is_none()
            && self.prompt.is_none()
            && self.response.is_none()
            && self.iterations.is_none()
    }

    fn overlay(&mut self, explicit: StepArtifacts) {
        if explicit.input.is_some() {
            self.input = explicit.input;
        }
        if explicit.output.is_some() {
            self.output = explicit.output;
        }
        if explicit.prompt.is_some() {
            self.prompt = explicit.prompt;
        }
        if explicit.response.is_some() {
            self.response = explicit.response;
        }
        if explicit.iterations.is_some() {
            self.iterations = explicit.iterations;
        }
    }
}

/// What the router hands the store for persistence.
#[derive(Debug, Clone)]
pub struct StorableRun {
    pub run_id: RunId,
    pub workflow_id: String,
    pub input: Value,
    pub output: Option<Value>,
    pub duration_ms: u64,
    pub started_at_ms: u64,
    pub trace: Trace,
    /// Explicit per-step artifacts layered over trace synthesis.
    pub steps: Option<BTreeMap<String, StepArtifacts>>,
}

/// Contents of `metadata.json`. Timestamps are ISO-8601.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub workflow_id: String,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    pub duration_ms: u64,
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredRunSummary {
    pub run_id: String,
    #[serde(flatten)]
    pub metadata: RunMetadata,
}

/// Filters for `list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub workflow_id: Option<String>,
    pub limit: Option<usize>,
}

/// Artifact store over one repository.
#[derive(Debug, Clone)]
pub struct GitStore {
    git: Git,
}

impl GitStore {
    pub fn new(repo_dir: PathBuf) -> Self {
        Self { git: Git::new(repo_dir) }
    }

    fn ref_for(run_id: &str) -> String {
        format!("{}/{}", RUNS_REF_NAMESPACE, run_id)
    }

    fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, GitStoreError> {
        serde_json::to_vec_pretty(value).map_err(|e| GitStoreError::Invalid(e.to_string()))
    }

    fn iso8601(epoch_ms: u64) -> String {
        chrono::DateTime::from_timestamp_millis(epoch_ms as i64)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_default()
    }

    /// Persist a run tree and point its ref at it.
    pub async fn store(&self, run: &StorableRun) -> Result<(), GitStoreError> {
        let steps = synthesize_steps(&run.trace, run.steps.as_ref());

        let trace_sha = self.git.hash_object(&Self::to_json(&run.trace)?).await?;
        let metadata = RunMetadata {
            workflow_id: run.workflow_id.clone(),
            input: run.input.clone(),
            output: run.output.clone(),
            duration_ms: run.duration_ms,
            started_at: Self::iso8601(run.started_at_ms),
            commit_sha: None,
        };
        let metadata_sha = self.git.hash_object(&Self::to_json(&metadata)?).await?;

        let mut root = vec![
            TreeEntry::blob(metadata_sha, "metadata.json"),
            TreeEntry::blob(trace_sha, "trace.json"),
        ];

        if !steps.is_empty() {
            let mut step_entries = Vec::new();
            for (step_id, artifacts) in &steps {
                let mut entries = Vec::new();
                if let Some(input) = &artifacts.input {
                    let sha = self.git.hash_object(&Self::to_json(input)?).await?;
                    entries.push(TreeEntry::blob(sha, "input.json"));
                }
                if let Some(output) = &artifacts.output {
                    let sha = self.git.hash_object(&Self::to_json(output)?).await?;
                    entries.push(TreeEntry::blob(sha, "output.json"));
                }
                if let Some(prompt) = &artifacts.prompt {
                    let sha = self.git.hash_object(prompt.as_bytes()).await?;
                    entries.push(TreeEntry::blob(sha, "prompt.txt"));
                }
                if let Some(response) = &artifacts.response {
                    let sha = self.git.hash_object(&Self::to_json(response)?).await?;
                    entries.push(TreeEntry::blob(sha, "response.json"));
                }
                if let Some(iterations) = &artifacts.iterations {
                    let sha = self.git.hash_object(&Self::to_json(iterations)?).await?;
                    entries.push(TreeEntry::blob(sha, "iterations.json"));
                }
                let sha = self.git.mktree(&entries).await?;
                step_entries.push(TreeEntry::tree(sha, step_id.clone()));
            }
            let steps_sha = self.git.mktree(&step_entries).await?;
            root.push(TreeEntry::tree(steps_sha, "steps"));
        }

        let tree_sha = self.git.mktree(&root).await?;
        self.git.update_ref(&Self::ref_for(run.run_id.as_str()), &tree_sha).await?;
        tracing::info!(run_id = %run.run_id, tree = %tree_sha, "run artifacts stored");
        Ok(())
    }

    /// Resolve a run id or unambiguous prefix to `(run_id, refname)`.
    async fn resolve_ref(&self, id_or_prefix: &str) -> Result<(String, String), GitStoreError> {
        let refs = self.git.for_each_ref(RUNS_REF_NAMESPACE).await?;
        let prefix = format!("{}/", RUNS_REF_NAMESPACE);
        let ids = refs.iter().filter_map(|(refname, _)| {
            refname.strip_prefix(&prefix).map(|run_id| (run_id.to_string(), refname.clone()))
        });

        let mut unique_prefix_match = None;
        let mut ambiguous = false;
        for (run_id, refname) in ids {
            if run_id == id_or_prefix {
                return Ok((run_id, refname));
            }
            if run_id.starts_with(id_or_prefix) {
                ambiguous = unique_prefix_match.is_some();
                unique_prefix_match = Some((run_id, refname));
            }
        }
        match unique_prefix_match {
            Some(hit) if !ambiguous => Ok(hit),
            _ => Err(GitStoreError::RunNotFound(id_or_prefix.to_string())),
        }
    }

    /// Parse `metadata.json` from every matching ref, newest first.
    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<StoredRunSummary>, GitStoreError> {
        let refs = self.git.for_each_ref(RUNS_REF_NAMESPACE).await?;
        let prefix = format!("{}/", RUNS_REF_NAMESPACE);

        let mut summaries = Vec::new();
        for (refname, _) in refs {
            let Some(run_id) = refname.strip_prefix(&prefix) else {
                continue;
            };
            let raw = match self.git.cat_file(&format!("{}:metadata.json", refname)).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(refname = %refname, error = %e, "unreadable run metadata");
                    continue;
                }
            };
            let metadata: RunMetadata = match serde_json::from_str(&raw) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(refname = %refname, error = %e, "malformed run metadata");
                    continue;
                }
            };
            if let Some(workflow_id) = &filter.workflow_id {
                if &metadata.workflow_id != workflow_id {
                    continue;
                }
            }
            summaries.push(StoredRunSummary { run_id: run_id.to_string(), metadata });
        }

        summaries.sort_by(|a, b| b.metadata.started_at.cmp(&a.metadata.started_at));
        if let Some(limit) = filter.limit {
            summaries.truncate(limit);
        }
        Ok(summaries)
    }

    pub async fn get_trace(&self, id_or_prefix: &str) -> Result<Trace, GitStoreError> {
        let (_, refname) = self.resolve_ref(id_or_prefix).await?;
        let raw = self.git.cat_file(&format!("{}:trace.json", refname)).await?;
        serde_json::from_str(&raw).map_err(|e| GitStoreError::Invalid(e.to_string()))
    }

    pub async fn get_metadata(&self, id_or_prefix: &str) -> Result<RunMetadata, GitStoreError> {
        let (_, refname) = self.resolve_ref(id_or_prefix).await?;
        let raw = self.git.cat_file(&format!("{}:metadata.json", refname)).await?;
        serde_json::from_str(&raw).map_err(|e| GitStoreError::Invalid(e.to_string()))
    }

    pub async fn get_step_artifacts(
        &self,
        id_or_prefix: &str,
        step_id: &str,
    ) -> Result<StepArtifacts, GitStoreError> {
        let (run_id, refname) = self.resolve_ref(id_or_prefix).await?;
        let step_tree = format!("{}:steps/{}", refname, step_id);
        let entries = self.git.ls_tree(&step_tree).await.map_err(|_| {
            GitStoreError::StepNotFound { run_id: run_id.clone(), step_id: step_id.to_string() }
        })?;

        let mut artifacts = StepArtifacts::default();
        for entry in entries {
            let raw = self.git.cat_file(&format!("{}/{}", step_tree, entry.name)).await?;
            match entry.name.as_str() {
                "input.json" => artifacts.input = Some(parse_json(&raw)?),
                "output.json" => artifacts.output = Some(parse_json(&raw)?),
                "prompt.txt" => artifacts.prompt = Some(raw),
                "response.json" => artifacts.response = Some(parse_json(&raw)?),
                "iterations.json" => artifacts.iterations = Some(parse_json(&raw)?),
                other => {
                    tracing::debug!(step_id, entry = other, "ignoring unknown step artifact");
                }
            }
        }
        Ok(artifacts)
    }

    /// Rewrite `metadata.json` with a commit link, preserving the rest of
    /// the tree. Best-effort traversal: entries `ls-tree` reports survive.
    pub async fn link_to_commit(
        &self,
        id_or_prefix: &str,
        commit_sha: &str,
    ) -> Result<(), GitStoreError> {
        let (run_id, refname) = self.resolve_ref(id_or_prefix).await?;
        let tree_sha = self.git.rev_parse(&refname).await?;
        let entries = self.git.ls_tree(&tree_sha).await?;

        let raw = self.git.cat_file(&format!("{}:metadata.json", refname)).await?;
        let mut metadata: RunMetadata =
            serde_json::from_str(&raw).map_err(|e| GitStoreError::Invalid(e.to_string()))?;
        metadata.commit_sha = Some(commit_sha.to_string());
        let metadata_sha = self.git.hash_object(&Self::to_json(&metadata)?).await?;

        let rebuilt: Vec<TreeEntry> = entries
            .into_iter()
            .map(|entry| {
                if entry.name == "metadata.json" {
                    TreeEntry::blob(metadata_sha.clone(), "metadata.json")
                } else {
                    entry
                }
            })
            .collect();
        let new_tree = self.git.mktree(&rebuilt).await?;
        self.git.update_ref(&refname, &new_tree).await?;
        tracing::info!(run_id = %run_id, commit_sha, "run linked to commit");
        Ok(())
    }

    /// Sync the whole namespace to a remote.
    pub async fn push(&self, remote: Option<&str>) -> Result<(), GitStoreError> {
        let refspec = format!("{ns}/*:{ns}/*", ns = RUNS_REF_NAMESPACE);
        self.git.push(remote.unwrap_or(DEFAULT_REMOTE), &refspec).await
    }

    /// Fetch the whole namespace from a remote.
    pub async fn pull(&self, remote: Option<&str>) -> Result<(), GitStoreError> {
        let refspec = format!("{ns}/*:{ns}/*", ns = RUNS_REF_NAMESPACE);
        self.git.fetch(remote.unwrap_or(DEFAULT_REMOTE), &refspec).await
    }
}

fn parse_json(raw: &str) -> Result<Value, GitStoreError> {
    serde_json::from_str(raw).map_err(|e| GitStoreError::Invalid(e.to_string()))
}

/// Derive per-step artifacts from the trace, then overlay explicit ones.
fn synthesize_steps(
    trace: &Trace,
    explicit: Option<&BTreeMap<String, StepArtifacts>>,
) -> BTreeMap<String, StepArtifacts> {
    let mut steps: BTreeMap<String, StepArtifacts> = BTreeMap::new();
    for event in &trace.events {
        match event {
            TraceEvent::StepStart { step_id, input, .. } => {
                steps.entry(step_id.clone()).or_default().input = Some(input.clone());
            }
            TraceEvent::StepComplete { step_id, output, .. } => {
                steps.entry(step_id.clone()).or_default().output = Some(output.clone());
            }
            TraceEvent::AgentPromptSent { step_id, prompt, .. } => {
                steps.entry(step_id.clone()).or_default().prompt = Some(prompt.clone());
            }
            TraceEvent::AgentResponse { step_id, response, .. } => {
                steps.entry(step_id.clone()).or_default().response = Some(response.clone());
            }
            _ => {}
        }
    }
    if let Some(explicit) = explicit {
        for (step_id, artifacts) in explicit {
            steps.entry(step_id.clone()).or_default().overlay(artifacts.clone());
        }
    }
    steps.retain(|_, artifacts| !artifacts.is_empty());
    steps
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
