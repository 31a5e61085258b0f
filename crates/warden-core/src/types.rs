//! Shared input and result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::trace::ExecutionTrace;

/// Input presented to a capability.
///
/// Each capability decides which variants it accepts; anything else is
/// reported as [`crate::ValidationError::UnsupportedInput`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationInput {
    /// Raw document text (XML, or JSON that has not been parsed yet).
    Text(String),

    /// An already-parsed JSON payload.
    Json(serde_json::Value),

    /// An agent execution trace.
    Trace(ExecutionTrace),
}

impl ValidationInput {
    /// Create a text input.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Json(_) => "json",
            Self::Trace(_) => "trace",
        }
    }
}

impl From<serde_json::Value> for ValidationInput {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<ExecutionTrace> for ValidationInput {
    fn from(trace: ExecutionTrace) -> Self {
        Self::Trace(trace)
    }
}

/// One structured finding inside a [`ValidationResult`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Stable machine-readable code (e.g., "json.schema", "governance.violation")
    pub code: String,

    /// Human-readable description
    pub message: String,

    /// Where the issue was found (e.g., "/items/0", "trace[..2]")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            location: None,
        }
    }

    /// Attach a location to the issue.
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Outcome of one capability invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ValidationResult {
    /// Whether the input passed
    pub valid: bool,

    /// Ordered findings; empty when `valid` is true
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,

    /// Free-form diagnostics keyed by name
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ValidationResult {
    /// A passing result with no findings.
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Build a result from findings. Valid iff there are none.
    pub fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            metadata: BTreeMap::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }

    /// Append a finding, marking the result invalid.
    pub fn push_issue(&mut self, issue: ValidationIssue) {
        self.valid = false;
        self.errors.push(issue);
    }
}
