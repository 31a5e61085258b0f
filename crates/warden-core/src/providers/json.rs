//! JSON payload capability backed by JSON Schema.
//!
//! # Validation Profile
//!
//! - **Depth limit**: payloads nested deeper than [`MAX_DEPTH`] are rejected
//!   before schema validation runs
//! - **Schema validation**: every violation is reported, located by its JSON
//!   pointer into the payload
//! - **Text input**: unparsed payloads are parsed first; a parse failure is a
//!   finding (`json.parse`), not an invocation error

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::manager::{ManagerError, Provider, ValidationManager};
use crate::types::{ValidationInput, ValidationIssue, ValidationResult};
use crate::ValidationError;

use super::JSON_PAYLOAD;

/// Maximum nesting depth accepted in a payload.
pub const MAX_DEPTH: usize = 128;

/// Errors from building a schema validator.
#[derive(Error, Debug)]
pub enum JsonSchemaError {
    #[error("Invalid JSON schema: {0}")]
    Invalid(String),
}

/// A compiled JSON Schema, shareable across threads.
pub struct JsonSchemaValidator {
    schema: jsonschema::Validator,
}

impl JsonSchemaValidator {
    /// Compile `schema`. Compilation happens once, at registration.
    pub fn new(schema: &Value) -> Result<Self, JsonSchemaError> {
        let schema = jsonschema::options()
            .build(schema)
            .map_err(|e| JsonSchemaError::Invalid(e.to_string()))?;
        Ok(Self { schema })
    }

    /// Validate a parsed payload.
    pub fn validate_value(&self, payload: &Value) -> ValidationResult {
        if let Some(path) = exceeds_depth(payload, MAX_DEPTH) {
            return ValidationResult::from_issues(vec![ValidationIssue::new(
                "json.depth",
                format!("maximum depth of {} exceeded", MAX_DEPTH),
            )
            .at(path)]);
        }

        let issues = self
            .schema
            .iter_errors(payload)
            .map(|e| {
                let path = e.instance_path.to_string();
                let location = if path.is_empty() { "/".to_string() } else { path };
                ValidationIssue::new("json.schema", e.to_string()).at(location)
            })
            .collect();
        ValidationResult::from_issues(issues)
    }

    /// Parse then validate a payload given as text.
    pub fn validate_text(&self, payload: &str) -> ValidationResult {
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => self.validate_value(&value),
            Err(e) => ValidationResult::from_issues(vec![ValidationIssue::new(
                "json.parse",
                e.to_string(),
            )
            .at(format!("{}:{}", e.line(), e.column()))]),
        }
    }
}

/// Returns the pointer of the first value deeper than `limit`, if any.
fn exceeds_depth(value: &Value, limit: usize) -> Option<String> {
    let mut stack: Vec<(&Value, usize, String)> = vec![(value, 0, String::new())];
    while let Some((value, depth, path)) = stack.pop() {
        if depth > limit {
            return Some(if path.is_empty() { "/".to_string() } else { path });
        }
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    stack.push((item, depth + 1, format!("{}/{}", path, i)));
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    stack.push((item, depth + 1, format!("{}/{}", path, key)));
                }
            }
            _ => {}
        }
    }
    None
}

/// Register `json_payload`, validating against `schema`.
pub fn register_json_validation(
    manager: &mut ValidationManager,
    schema: &Value,
) -> Result<(), ManagerError> {
    let validator = JsonSchemaValidator::new(schema).map_err(|e| ManagerError::Configuration {
        service: manager.service().to_string(),
        capability: JSON_PAYLOAD.to_string(),
        reason: e.to_string(),
    })?;
    let validator = Arc::new(validator);
    let service = manager.service().to_string();

    manager.register(
        JSON_PAYLOAD,
        Arc::new(move |input: &ValidationInput| -> Result<ValidationResult, ValidationError> {
            let result = match input {
                ValidationInput::Json(payload) => validator.validate_value(payload),
                ValidationInput::Text(payload) => validator.validate_text(payload),
                other => {
                    return Err(ValidationError::UnsupportedInput {
                        capability: JSON_PAYLOAD.to_string(),
                        kind: other.kind(),
                    })
                }
            };
            Ok(result
                .with_metadata("service", &service)
                .with_metadata("capability", JSON_PAYLOAD))
        }),
    )
}

/// Provider form of [`register_json_validation`].
pub fn json_validation(schema: &Value) -> impl Provider + '_ {
    move |manager: &mut ValidationManager| register_json_validation(manager, schema)
}
