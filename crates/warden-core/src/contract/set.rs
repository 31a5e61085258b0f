//! Named contracts and contract sets, loadable from YAML/JSON.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{parse_formula_with_alphabet, validate_contract_set_schema, ContractError, Formula};
use crate::patterns::{is_contract_name, is_predicate_name};

/// Wire form of a single contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContractSpec {
    name: String,
    formula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    best_effort: bool,
}

/// Wire form of a contract set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContractSetSpec {
    alphabet: Vec<String>,
    #[serde(default)]
    contracts: Vec<ContractSpec>,
}

/// A named temporal formula.
///
/// Immutable once built. A best-effort contract reports obligations still
/// pending at the end of a trace as inconclusive instead of violated.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    name: String,
    formula: Formula,
    description: Option<String>,
    best_effort: bool,
}

impl Contract {
    /// Parse `formula` against `alphabet` and name the result.
    pub fn new(
        name: impl Into<String>,
        formula: &str,
        alphabet: &BTreeSet<String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        if !is_contract_name(&name) {
            return Err(ContractError::InvalidName(name));
        }
        let formula =
            parse_formula_with_alphabet(formula, alphabet).map_err(|e| ContractError::InContract {
                contract: name.clone(),
                source: Box::new(e),
            })?;
        Ok(Self::from_formula_unchecked(name, formula))
    }

    /// Wrap an already-built formula. Its predicates are not checked here;
    /// [`ContractSet::insert`] does that against the set's alphabet.
    pub fn from_formula(name: impl Into<String>, formula: Formula) -> Result<Self, ContractError> {
        let name = name.into();
        if !is_contract_name(&name) {
            return Err(ContractError::InvalidName(name));
        }
        Ok(Self::from_formula_unchecked(name, formula))
    }

    fn from_formula_unchecked(name: String, formula: Formula) -> Self {
        Self {
            name,
            formula,
            description: None,
            best_effort: false,
        }
    }

    /// Mark the contract best-effort.
    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_best_effort(&self) -> bool {
        self.best_effort
    }
}

/// A declared predicate alphabet and the contracts written over it.
///
/// Contract names are unique; order is preserved and determines the order
/// of verdicts and reported violations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractSet {
    alphabet: BTreeSet<String>,
    contracts: Vec<Contract>,
}

impl ContractSet {
    /// Create an empty set over the given alphabet.
    pub fn new<I, S>(alphabet: I) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut declared = BTreeSet::new();
        for predicate in alphabet {
            let predicate = predicate.into();
            if !is_predicate_name(&predicate) {
                return Err(ContractError::InvalidPredicate(predicate));
            }
            declared.insert(predicate);
        }
        Ok(Self {
            alphabet: declared,
            contracts: Vec::new(),
        })
    }

    /// Parse and add a contract.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        formula: &str,
        best_effort: bool,
    ) -> Result<&Contract, ContractError> {
        let mut contract = Contract::new(name, formula, &self.alphabet)?;
        contract.best_effort = best_effort;
        self.push(contract)
    }

    /// Add a prebuilt contract, checking its predicates against the alphabet.
    pub fn insert(&mut self, contract: Contract) -> Result<&Contract, ContractError> {
        let unknown = contract
            .formula
            .predicates()
            .into_iter()
            .find(|p| !self.alphabet.contains(*p))
            .map(str::to_string);
        if let Some(predicate) = unknown {
            // Reparse the canonical text to report the offending position.
            // Atoms that print as reserved words reparse cleanly, so those
            // are reported without one.
            let canonical = contract.formula.to_string();
            let source = match parse_formula_with_alphabet(&canonical, &self.alphabet) {
                Err(e) => e,
                Ok(_) => ContractError::UnknownPredicate {
                    predicate,
                    position: 0,
                },
            };
            return Err(ContractError::InContract {
                contract: contract.name,
                source: Box::new(source),
            });
        }
        self.push(contract)
    }

    fn push(&mut self, contract: Contract) -> Result<&Contract, ContractError> {
        if self.get(&contract.name).is_some() {
            return Err(ContractError::DuplicateContract(contract.name));
        }
        debug!(
            contract = %contract.name,
            formula = %contract.formula,
            best_effort = contract.best_effort,
            "Contract added"
        );
        self.contracts.push(contract);
        Ok(&self.contracts[self.contracts.len() - 1])
    }

    pub fn alphabet(&self) -> &BTreeSet<String> {
        &self.alphabet
    }

    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    pub fn get(&self, name: &str) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Parse a contract set from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ContractError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a contract set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ContractError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a contract set from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a contract set from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a contract set from a file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ContractError> {
        validate_contract_set_schema(&value).map_err(ContractError::Schema)?;
        let spec: ContractSetSpec = serde_json::from_value(value)?;

        let mut set = Self::new(spec.alphabet)?;
        for contract in spec.contracts {
            let mut built = Contract::new(contract.name, &contract.formula, &set.alphabet)?;
            built.description = contract.description;
            built.best_effort = contract.best_effort;
            set.push(built)?;
        }
        Ok(set)
    }

    /// Serialize to YAML with formulas in canonical form.
    pub fn to_yaml(&self) -> Result<String, ContractError> {
        let spec = ContractSetSpec {
            alphabet: self.alphabet.iter().cloned().collect(),
            contracts: self
                .contracts
                .iter()
                .map(|c| ContractSpec {
                    name: c.name.clone(),
                    formula: c.formula.to_string(),
                    description: c.description.clone(),
                    best_effort: c.best_effort,
                })
                .collect(),
        };
        Ok(serde_yaml::to_string(&spec)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_SET: &str = r#"
alphabet: [request, response, error, escalated]
contracts:
  - name: request-response-liveness
    formula: "G(request -> F response)"
    description: "Every request is eventually answered"
  - name: error-escalation
    formula: "G(error -> F escalated)"
    best_effort: true
"#;

    #[test]
    fn test_parse_valid_set() {
        let set = ContractSet::from_yaml(VALID_SET).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.alphabet().len(), 4);

        let liveness = set.get("request-response-liveness").unwrap();
        assert!(!liveness.is_best_effort());
        assert_eq!(liveness.description(), Some("Every request is eventually answered"));
        assert!(set.get("error-escalation").unwrap().is_best_effort());
    }

    #[test]
    fn test_unknown_predicate_in_yaml() {
        let yaml = r#"
alphabet: [request]
contracts:
  - name: liveness
    formula: "G(request -> F response)"
"#;
        let err = ContractSet::from_yaml(yaml).unwrap_err();
        assert!(matches!(
            err.root(),
            ContractError::UnknownPredicate { predicate, .. } if predicate == "response"
        ));
    }

    #[test]
    fn test_duplicate_contract_names() {
        let yaml = r#"
alphabet: [a]
contracts:
  - name: rule
    formula: "G a"
  - name: rule
    formula: "F a"
"#;
        assert!(matches!(
            ContractSet::from_yaml(yaml),
            Err(ContractError::DuplicateContract(name)) if name == "rule"
        ));
    }

    #[test]
    fn test_schema_rejects_unknown_fields() {
        let yaml = r#"
alphabet: [a]
contracts:
  - name: rule
    formula: "G a"
    severity: high
"#;
        assert!(matches!(
            ContractSet::from_yaml(yaml),
            Err(ContractError::Schema(_))
        ));
    }

    #[test]
    fn test_invalid_alphabet_entry() {
        assert!(matches!(
            ContractSet::new(["ok", "true"]),
            Err(ContractError::InvalidPredicate(p)) if p == "true"
        ));
    }

    #[test]
    fn test_insert_checks_alphabet() {
        let mut set = ContractSet::new(["a"]).unwrap();
        let foreign = Contract::from_formula(
            "foreign",
            Formula::globally(Formula::atom("b")),
        )
        .unwrap();

        let err = set.insert(foreign).unwrap_err();
        assert!(matches!(
            err.root(),
            ContractError::UnknownPredicate { predicate, position: 3 } if predicate == "b"
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_rejects_atom_named_like_constant() {
        let mut set = ContractSet::new(["a"]).unwrap();
        let constant_lookalike = Contract::from_formula("lookalike", Formula::atom("true")).unwrap();

        let err = set.insert(constant_lookalike).unwrap_err();
        assert!(matches!(
            err.root(),
            ContractError::UnknownPredicate { predicate, position: 0 } if predicate == "true"
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn test_yaml_round_trip_is_canonical() {
        let set = ContractSet::from_yaml(VALID_SET).unwrap();
        let yaml = set.to_yaml().unwrap();
        assert!(yaml.contains("(G (request -> (F response)))"));

        let reloaded = ContractSet::from_yaml(&yaml).unwrap();
        assert_eq!(set, reloaded);
    }

    #[test]
    fn test_invalid_contract_name() {
        let mut set = ContractSet::new(["a"]).unwrap();
        assert!(matches!(
            set.add("Not Kebab", "G a", false),
            Err(ContractError::InvalidName(_))
        ));
    }
}
