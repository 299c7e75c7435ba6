// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git plumbing via the `git` binary.
//!
//! Blobs and trees are written with `hash-object`/`mktree` and anchored
//! by refs, so run artifacts are reachable without ever appearing in
//! commit history.

use super::GitStoreError;
use rb_adapters::subprocess::{run_with_input, run_with_timeout, GIT_COMMAND_TIMEOUT, GIT_SYNC_TIMEOUT};
use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// One `ls-tree` / `mktree` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TreeEntry {
    pub mode: String,
    pub otype: String,
    pub sha: String,
    pub name: String,
}

impl TreeEntry {
    pub fn blob(sha: impl Into<String>, name: impl Into<String>) -> Self {
        Self { mode: "100644".into(), otype: "blob".into(), sha: sha.into(), name: name.into() }
    }

    pub fn tree(sha: impl Into<String>, name: impl Into<String>) -> Self {
        Self { mode: "040000".into(), otype: "tree".into(), sha: sha.into(), name: name.into() }
    }
}

/// Handle to one repository's object database.
#[derive(Debug, Clone)]
pub(crate) struct Git {
    repo_dir: PathBuf,
}

impl Git {
    pub fn new(repo_dir: PathBuf) -> Self {
        Self { repo_dir }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_dir);
        cmd.args(args);
        cmd
    }

    fn check(output: Output, op: &str) -> Result<String, GitStoreError> {
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
        } else {
            Err(GitStoreError::Command {
                op: op.to_string(),
                cause: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    pub async fn run(&self, args: &[&str]) -> Result<String, GitStoreError> {
        self.run_with_deadline(args, GIT_COMMAND_TIMEOUT).await
    }

    async fn run_with_deadline(
        &self,
        args: &[&str],
        timeout: Duration,
    ) -> Result<String, GitStoreError> {
        let op = args.first().copied().unwrap_or("git");
        let output = run_with_timeout(self.command(args), timeout, op)
            .await
            .map_err(|cause| GitStoreError::Command { op: op.to_string(), cause })?;
        Self::check(output, op)
    }

    async fn run_with_stdin(&self, args: &[&str], input: &[u8]) -> Result<String, GitStoreError> {
        let op = args.first().copied().unwrap_or("git");
        let output = run_with_input(self.command(args), input, GIT_COMMAND_TIMEOUT, op)
            .await
            .map_err(|cause| GitStoreError::Command { op: op.to_string(), cause })?;
        Self::check(output, op)
    }

    /// Write a blob; returns its sha.
    pub async fn hash_object(&self, content: &[u8]) -> Result<String, GitStoreError> {
        self.run_with_stdin(&["hash-object", "-w", "--stdin"], content).await
    }

    /// Write a tree from entries; returns its sha.
    pub async fn mktree(&self, entries: &[TreeEntry]) -> Result<String, GitStoreError> {
        let listing: String = entries
            .iter()
            .map(|e| format!("{} {} {}\t{}\n", e.mode, e.otype, e.sha, e.name))
            .collect();
        self.run_with_stdin(&["mktree"], listing.as_bytes()).await
    }

    pub async fn update_ref(&self, ref_name: &str, sha: &str) -> Result<(), GitStoreError> {
        self.run(&["update-ref", ref_name, sha]).await.map(|_| ())
    }

    /// `(refname, sha)` pairs under `pattern`.
    pub async fn for_each_ref(&self, pattern: &str) -> Result<Vec<(String, String)>, GitStoreError> {
        let output = self
            .run(&["for-each-ref", "--format=%(refname) %(objectname)", pattern])
            .await?;
        Ok(output
            .lines()
            .filter_map(|line| {
                let (refname, sha) = line.split_once(' ')?;
                Some((refname.to_string(), sha.to_string()))
            })
            .collect())
    }

    /// Pretty-print an object (`sha`, `ref`, or `tree-ish:path`).
    pub async fn cat_file(&self, object: &str) -> Result<String, GitStoreError> {
        self.run(&["cat-file", "-p", object]).await
    }

    pub async fn rev_parse(&self, rev: &str) -> Result<String, GitStoreError> {
        self.run(&["rev-parse", "--verify", rev]).await
    }

    pub async fn ls_tree(&self, tree_ish: &str) -> Result<Vec<TreeEntry>, GitStoreError> {
        let output = self.run(&["ls-tree", tree_ish]).await?;
        Ok(output
            .lines()
            .filter_map(|line| {
                // "<mode> <type> <sha>\t<name>"
                let (meta, name) = line.split_once('\t')?;
                let mut fields = meta.split_whitespace();
                Some(TreeEntry {
                    mode: fields.next()?.to_string(),
                    otype: fields.next()?.to_string(),
                    sha: fields.next()?.to_string(),
                    name: name.to_string(),
                })
            })
            .collect())
    }

    pub async fn push(&self, remote: &str, refspec: &str) -> Result<(), GitStoreError> {
        self.run_with_deadline(&["push", remote, refspec], GIT_SYNC_TIMEOUT).await.map(|_| ())
    }

    pub async fn fetch(&self, remote: &str, refspec: &str) -> Result<(), GitStoreError> {
        self.run_with_deadline(&["fetch", remote, refspec], GIT_SYNC_TIMEOUT).await.map(|_| ())
    }
}
