//! Shared identifier patterns.
//!
//! Capability names, predicate names and contract names are validated at
//! registration time against the patterns below, so malformed identifiers
//! fail service startup instead of surfacing at invocation.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Capability keys: `xml_document`, `agent_execution`.
    pub static ref CAPABILITY_NAME_PATTERN: Regex = Regex::new(
        r"^[a-z][a-z0-9_]*$"
    ).unwrap();

    /// Predicate labels carried by trace events: `is_authorized`, `request`.
    pub static ref PREDICATE_NAME_PATTERN: Regex = Regex::new(
        r"^[a-z_][a-z0-9_]*$"
    ).unwrap();

    /// Contract names are kebab case: `request-response-liveness`.
    pub static ref CONTRACT_NAME_PATTERN: Regex = Regex::new(
        r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$"
    ).unwrap();
}

/// Words that lex as constants and can never name a predicate.
pub const RESERVED_WORDS: &[&str] = &["true", "false"];

/// Check if a string is a valid capability name.
pub fn is_capability_name(name: &str) -> bool {
    CAPABILITY_NAME_PATTERN.is_match(name)
}

/// Check if a string is a valid predicate name.
pub fn is_predicate_name(name: &str) -> bool {
    PREDICATE_NAME_PATTERN.is_match(name) && !RESERVED_WORDS.contains(&name)
}

/// Check if a string is a valid contract name.
pub fn is_contract_name(name: &str) -> bool {
    CONTRACT_NAME_PATTERN.is_match(name)
}
