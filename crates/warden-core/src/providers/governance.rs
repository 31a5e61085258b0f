//! Agent governance capability: execution traces against temporal contracts.

use std::sync::Arc;

use tracing::info;

use crate::checker::{TraceChecker, VerdictStatus};
use crate::contract::{ContractError, ContractSet};
use crate::manager::{ManagerError, Provider, ValidationManager};
use crate::trace::ExecutionTrace;
use crate::types::{ValidationInput, ValidationIssue, ValidationResult};
use crate::registry::ValidationOperation;
use crate::ValidationError;

use super::AGENT_EXECUTION;

/// Predicates the built-in contracts are written over.
pub const DEFAULT_ALPHABET: &[&str] = &[
    "request",
    "response",
    "action",
    "authorized",
    "unauthorized_action",
    "terminal",
    "error",
    "escalated",
];

/// (name, formula, description, best_effort)
const DEFAULT_CONTRACTS: &[(&str, &str, &str, bool)] = &[
    (
        "authorization-before-action",
        "(!action U authorized) | G !action",
        "No action is taken before the execution is authorized",
        false,
    ),
    (
        "request-response-liveness",
        "G(request -> F response)",
        "Every request is eventually followed by a response",
        false,
    ),
    (
        "no-unauthorized-action",
        "G !unauthorized_action",
        "No step performs an unauthorized action",
        false,
    ),
    (
        "authorized-termination",
        "(!terminal U authorized) | G !terminal",
        "No execution reaches a terminal state without prior authorization",
        false,
    ),
    (
        "terminal-is-final",
        "G(terminal -> !(X true))",
        "Nothing happens after a terminal state",
        false,
    ),
    (
        "error-escalation",
        "G(error -> F escalated)",
        "Every error is eventually escalated",
        true,
    ),
];

/// The built-in governance contract set.
pub fn default_contract_set() -> Result<ContractSet, ContractError> {
    let mut set = ContractSet::new(DEFAULT_ALPHABET.iter().copied())?;
    for (name, formula, description, best_effort) in DEFAULT_CONTRACTS {
        let contract = crate::contract::Contract::new(*name, formula, set.alphabet())?
            .with_description(*description);
        let contract = if *best_effort { contract.best_effort() } else { contract };
        set.insert(contract)?;
    }
    Ok(set)
}

/// Checks a trace against every contract of a set and folds the verdicts
/// into one result: one issue per violated contract.
pub struct GovernanceOperation {
    service: String,
    contracts: ContractSet,
    checker: TraceChecker,
}

impl GovernanceOperation {
    pub fn new(service: impl Into<String>, contracts: ContractSet) -> Self {
        Self {
            service: service.into(),
            contracts,
            checker: TraceChecker::new(),
        }
    }

    pub fn contracts(&self) -> &ContractSet {
        &self.contracts
    }

    /// Check a decoded trace.
    pub fn check_trace(&self, trace: &ExecutionTrace) -> ValidationResult {
        let verdicts = self.checker.check_all(&self.contracts, trace);

        let mut result = ValidationResult::valid()
            .with_metadata("service", &self.service)
            .with_metadata("capability", AGENT_EXECUTION)
            .with_metadata("trace_length", trace.len());

        let mut violated = 0;
        let mut inconclusive = 0;
        for (verdict, contract) in verdicts.iter().zip(self.contracts.contracts()) {
            result
                .metadata
                .insert(format!("verdict.{}", verdict.contract), verdict.status.as_str().to_string());

            match verdict.status {
                VerdictStatus::Satisfied => {}
                VerdictStatus::Inconclusive => inconclusive += 1,
                VerdictStatus::Violated => {
                    violated += 1;
                    let witnessed = verdict.counterexample.as_ref().map_or(0, |c| c.len());
                    let mut message = format!(
                        "Contract '{}' violated: {}",
                        contract.name(),
                        contract.formula()
                    );
                    if let Some(description) = contract.description() {
                        message.push_str(&format!(" ({})", description));
                    }
                    result.push_issue(
                        ValidationIssue::new("governance.violation", message)
                            .at(format!("trace[..{}]", witnessed)),
                    );
                }
            }
        }

        info!(
            service = %self.service,
            trace_len = trace.len(),
            checked = verdicts.len(),
            violated,
            inconclusive,
            "Execution trace checked"
        );

        result
            .with_metadata("contracts_checked", verdicts.len())
            .with_metadata("contracts_violated", violated)
            .with_metadata("contracts_inconclusive", inconclusive)
    }
}

impl ValidationOperation for GovernanceOperation {
    fn validate(&self, input: &ValidationInput) -> Result<ValidationResult, ValidationError> {
        match input {
            ValidationInput::Trace(trace) => Ok(self.check_trace(trace)),
            ValidationInput::Json(value) => Ok(self.check_trace(&ExecutionTrace::from_value(value)?)),
            ValidationInput::Text(json) => Ok(self.check_trace(&ExecutionTrace::from_json(json)?)),
        }
    }
}

/// Register `agent_execution` with the built-in contracts.
///
/// Malformed built-in contracts fail here, at registration, never later.
pub fn register_agent_governance_validation(
    manager: &mut ValidationManager,
) -> Result<(), ManagerError> {
    register_agent_governance_with(manager, default_contract_set()?)
}

/// Register `agent_execution` with a caller-supplied contract set.
pub fn register_agent_governance_with(
    manager: &mut ValidationManager,
    contracts: ContractSet,
) -> Result<(), ManagerError> {
    let operation = GovernanceOperation::new(manager.service(), contracts);
    info!(
        service = %manager.service(),
        contracts = operation.contracts().len(),
        "Installing agent governance"
    );
    manager.register(AGENT_EXECUTION, Arc::new(operation))
}

/// Provider form of [`register_agent_governance_with`].
pub fn agent_governance_with(contracts: ContractSet) -> impl Provider {
    move |manager: &mut ValidationManager| register_agent_governance_with(manager, contracts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn governed() -> ValidationManager {
        let mut manager = ValidationManager::new("ai_trading_service");
        register_agent_governance_validation(&mut manager).unwrap();
        manager
    }

    fn trace(steps: &[&[&str]]) -> ValidationInput {
        ExecutionTrace::from_labels(steps.iter().map(|s| s.iter().copied())).into()
    }

    #[test]
    fn test_default_set_builds() {
        let set = default_contract_set().unwrap();
        assert_eq!(set.len(), DEFAULT_CONTRACTS.len());
        assert!(set.get("error-escalation").unwrap().is_best_effort());
    }

    #[test]
    fn test_compliant_execution() {
        let result = governed()
            .invoke(
                AGENT_EXECUTION,
                &trace(&[
                    &["request"],
                    &["authorized"],
                    &["action"],
                    &["response"],
                    &["terminal"],
                ]),
            )
            .unwrap();

        assert!(result.valid, "unexpected errors: {:?}", result.errors);
        assert_eq!(result.metadata["contracts_checked"], "6");
        assert_eq!(result.metadata["contracts_violated"], "0");
        assert_eq!(result.metadata["verdict.request-response-liveness"], "satisfied");
    }

    #[test]
    fn test_one_issue_per_violated_contract() {
        // acts before authorization, never answers the request
        let result = governed()
            .invoke(
                AGENT_EXECUTION,
                &trace(&[&["request", "action"], &["authorized"], &[]]),
            )
            .unwrap();

        assert!(!result.valid);
        let codes: Vec<_> = result.errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["governance.violation", "governance.violation"]);
        assert!(result.errors[0].message.contains("authorization-before-action"));
        assert_eq!(result.errors[0].location.as_deref(), Some("trace[..1]"));
        assert!(result.errors[1].message.contains("request-response-liveness"));
        assert_eq!(result.errors[1].location.as_deref(), Some("trace[..3]"));
        assert_eq!(result.metadata["contracts_violated"], "2");
    }

    #[test]
    fn test_pending_escalation_is_not_an_error() {
        let result = governed()
            .invoke(AGENT_EXECUTION, &trace(&[&["authorized"], &["error"]]))
            .unwrap();

        assert!(result.valid);
        assert_eq!(result.metadata["verdict.error-escalation"], "inconclusive");
        assert_eq!(result.metadata["contracts_inconclusive"], "1");
    }

    #[test]
    fn test_json_trace_input() {
        let json = serde_json::json!({
            "events": [
                { "index": 0, "labels": ["authorized"] },
                { "index": 1, "labels": ["terminal"] }
            ]
        });
        let result = governed().invoke(AGENT_EXECUTION, &json.into()).unwrap();
        assert!(result.valid);
    }

    #[test]
    fn test_ill_ordered_trace_is_validation_error() {
        let json = r#"[{"index": 2}, {"index": 1}]"#;
        let err = governed()
            .invoke(AGENT_EXECUTION, &ValidationInput::text(json))
            .unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Validation(ValidationError::MalformedTrace(_))
        ));
    }

    #[test]
    fn test_custom_contract_set() {
        let mut set = ContractSet::new(["login", "logout"]).unwrap();
        set.add("logout-after-login", "G(login -> F logout)", false)
            .unwrap();

        let mut manager = ValidationManager::new("session_service");
        manager.apply(agent_governance_with(set)).unwrap();

        let result = manager
            .invoke(AGENT_EXECUTION, &trace(&[&["login"], &[]]))
            .unwrap();
        assert!(!result.valid);
        assert_eq!(result.metadata["contracts_checked"], "1");
    }
}
