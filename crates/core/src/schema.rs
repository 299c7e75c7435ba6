// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime JSON-schema validation.
//!
//! Every step carries its input and output schemas as plain
//! `serde_json::Value` documents. Validation happens at step boundaries
//! and produces issue lists; a schema mismatch is a step-level error,
//! never a process crash.

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One validation failure, anchored at a JSON pointer into the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    /// JSON pointer to the offending value ("" for the root).
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Render a list of issues as a single human-readable line.
pub fn issues_summary(issues: &[SchemaIssue]) -> String {
    issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; ")
}

/// Validate `instance` against `schema`, collecting every issue.
///
/// Schemas are compiled per call; the documents that travel with steps are
/// small and compilation is cheap relative to the step work around it.
/// An uncompilable schema reports as a single root-level issue rather than
/// an error axis of its own.
pub fn validate_schema(schema: &Value, instance: &Value) -> Result<(), Vec<SchemaIssue>> {
    let compiled = match JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(e) => {
            return Err(vec![SchemaIssue {
                path: String::new(),
                message: format!("schema failed to compile: {}", e),
            }]);
        }
    };

    // Collect while the compiled schema (and its error iterator) is alive.
    let issues = match compiled.validate(instance) {
        Ok(()) => return Ok(()),
        Err(errors) => errors
            .map(|e| SchemaIssue {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect::<Vec<_>>(),
    };
    Err(issues)
}

/// True when `instance` satisfies `schema`.
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    validate_schema(schema, instance).is_ok()
}

/// Render a schema as JSON-schema text for an agent system prompt.
pub fn schema_to_text(schema: &Value) -> String {
    serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
