//! Capability registry: named validation operations.
//!
//! The registry replaces attaching methods to a manager at runtime with an
//! explicit, typed mapping from capability name to operation. Callers never
//! look up behavior by reflection; they go through [`CapabilityRegistry::invoke`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::patterns::is_capability_name;
use crate::types::{ValidationInput, ValidationResult};
use crate::ValidationError;

/// A named validation behavior.
///
/// Implementations must be pure with respect to the registry: any state they
/// close over is either immutable or an external collaborator they manage
/// themselves. Closures of the right shape implement this trait.
pub trait ValidationOperation: Send + Sync {
    fn validate(&self, input: &ValidationInput) -> Result<ValidationResult, ValidationError>;
}

impl<F> ValidationOperation for F
where
    F: Fn(&ValidationInput) -> Result<ValidationResult, ValidationError> + Send + Sync,
{
    fn validate(&self, input: &ValidationInput) -> Result<ValidationResult, ValidationError> {
        self(input)
    }
}

/// Errors raised by the registry itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Capability '{0}' is already registered")]
    Duplicate(String),

    #[error("Invalid capability name '{0}': expected lowercase snake_case")]
    InvalidName(String),

    #[error("Capability '{0}' is not registered")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Mapping from capability name to validation operation.
///
/// Append-only: the first registration of a name wins and later attempts
/// fail rather than silently shadowing it.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    operations: BTreeMap<String, Arc<dyn ValidationOperation>>,
}

impl CapabilityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        operation: Arc<dyn ValidationOperation>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if !is_capability_name(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.operations.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.operations.insert(name, operation);
        Ok(())
    }

    /// Check if a capability is registered.
    pub fn has(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Run the operation bound to `name`, returning its result unchanged.
    pub fn invoke(
        &self,
        name: &str,
        input: &ValidationInput,
    ) -> Result<ValidationResult, RegistryError> {
        let operation = self
            .operations
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok(operation.validate(input)?)
    }

    /// Registered capability names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.operations.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}
