//! # warden-core
//!
//! Composable validation capabilities with temporal trace contracts.
//!
//! Services build a [`ValidationManager`], install exactly the capabilities
//! they need through providers, and invoke them by name:
//! - XML documents, through an external validator
//! - JSON payloads, against a JSON Schema
//! - Agent execution traces, against LTLf governance contracts
//!
//! ## Key Guarantees
//!
//! 1. **Append-only registration**: the first registration of a capability
//!    wins; duplicates fail at setup
//! 2. **Fail fast**: malformed contracts are rejected at registration, never
//!    at invocation
//! 3. **Deterministic**: the same contract and trace always produce the same
//!    verdict and counterexample
//! 4. **Parallel-safe**: invocation takes `&self` and shares no mutable state
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_core::{ValidationManager, ValidationInput, ExecutionTrace};
//! use warden_core::providers::{register_agent_governance_validation, AGENT_EXECUTION};
//!
//! let mut manager = ValidationManager::new("ai_trading_service");
//! register_agent_governance_validation(&mut manager)?;
//!
//! let trace = ExecutionTrace::from_json(&trace_json)?;
//! let result = manager.invoke(AGENT_EXECUTION, &ValidationInput::Trace(trace))?;
//!
//! for error in &result.errors {
//!     println!("{}: {}", error.code, error.message);
//! }
//! ```

pub mod checker;
pub mod contract;
pub mod manager;
pub mod patterns;
pub mod providers;
pub mod registry;
pub mod trace;
pub mod types;

// Re-export main types at crate root
pub use checker::{TraceChecker, Verdict, VerdictStatus};
pub use contract::{parse_formula, Contract, ContractError, ContractSet, Formula};
pub use manager::{ManagerError, Provider, ValidationManager};
pub use registry::{CapabilityRegistry, RegistryError, ValidationOperation};
pub use trace::{Event, ExecutionTrace};
pub use types::{ValidationInput, ValidationIssue, ValidationResult};

use thiserror::Error;

/// Malformed input presented to a capability.
///
/// Distinct from a failed validation: an invalid document yields a
/// `ValidationResult` with findings, while input the capability cannot
/// interpret at all yields this error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed trace: {0}")]
    MalformedTrace(String),

    #[error("Capability '{capability}' does not accept {kind} input")]
    UnsupportedInput {
        capability: String,
        kind: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{register_agent_governance_validation, AGENT_EXECUTION};

    #[test]
    fn test_basic_governance() {
        let mut manager = ValidationManager::new("agent_service");
        register_agent_governance_validation(&mut manager).unwrap();

        let trace = ExecutionTrace::from_labels(vec![
            vec!["request", "authorized"],
            vec!["action"],
            vec!["response"],
        ]);
        let result = manager
            .invoke(AGENT_EXECUTION, &ValidationInput::Trace(trace))
            .unwrap();

        assert!(result.valid);
    }

    #[test]
    fn test_unauthorized_action_blocked() {
        let mut manager = ValidationManager::new("agent_service");
        register_agent_governance_validation(&mut manager).unwrap();

        let trace = ExecutionTrace::from_labels(vec![vec!["authorized"], vec!["unauthorized_action"]]);
        let result = manager
            .invoke(AGENT_EXECUTION, &ValidationInput::Trace(trace))
            .unwrap();

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("no-unauthorized-action"));
    }
}
