//! Governance contracts.
//!
//! A contract is a named temporal formula over a declared predicate alphabet.
//! This module handles the formula grammar, canonical formatting, and loading
//! contract sets from YAML/JSON.

mod formula;
mod parser;
mod schema;
mod set;

pub use formula::Formula;
pub use parser::{parse_formula, parse_formula_with_alphabet, MAX_NESTING};
pub use schema::validate_contract_set_schema;
pub use set::{Contract, ContractSet};

use thiserror::Error;

/// Errors raised while building contracts.
///
/// All of these surface at registration time, never during invocation.
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Unknown predicate '{predicate}' at position {position}")]
    UnknownPredicate { predicate: String, position: usize },

    #[error("Invalid contract name: {0}")]
    InvalidName(String),

    #[error("Invalid predicate name in alphabet: {0}")]
    InvalidPredicate(String),

    #[error("Duplicate contract name: {0}")]
    DuplicateContract(String),

    #[error("Contract '{contract}': {source}")]
    InContract {
        contract: String,
        #[source]
        source: Box<ContractError>,
    },

    #[error("Contract set failed schema validation: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("Failed to read contract file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ContractError {
    /// The innermost error, skipping contract-name wrappers.
    pub fn root(&self) -> &ContractError {
        match self {
            Self::InContract { source, .. } => source.root(),
            other => other,
        }
    }
}
