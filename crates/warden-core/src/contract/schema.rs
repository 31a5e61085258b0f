//! JSON Schema validation for contract set documents.
//!
//! Contract set files are checked against `schema/contract-set.schema.json`
//! before they are deserialized, so authoring mistakes are reported with the
//! path of the offending value.

use std::sync::OnceLock;

use serde_json::Value;

const CONTRACT_SET_SCHEMA: &str = include_str!("../../schema/contract-set.schema.json");

/// The compiled schema, or why it failed to compile. Built on first use.
static VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn validator() -> Result<&'static jsonschema::Validator, String> {
    VALIDATOR
        .get_or_init(|| {
            let schema: Value = serde_json::from_str(CONTRACT_SET_SCHEMA)
                .map_err(|e| format!("embedded contract set schema is not JSON: {}", e))?;
            jsonschema::options()
                .build(&schema)
                .map_err(|e| format!("embedded contract set schema does not compile: {}", e))
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Check a contract set document against the embedded schema.
///
/// On failure, returns one `"<pointer>: <message>"` line per violation.
pub fn validate_contract_set_schema(document: &Value) -> Result<(), Vec<String>> {
    let validator = validator().map_err(|e| vec![e])?;

    let violations: Vec<String> = validator
        .iter_errors(document)
        .map(|e| {
            let pointer = e.instance_path.to_string();
            format!("{}: {}", if pointer.is_empty() { "/" } else { pointer.as_str() }, e)
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
