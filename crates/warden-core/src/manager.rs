//! The validation manager: one service identity plus its capabilities.
//!
//! A service builds a manager, applies the providers it needs, then shares it
//! (typically behind an `Arc`) for concurrent invocation. Registration takes
//! `&mut self` and happens during setup; invocation takes `&self`.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::contract::ContractError;
use crate::registry::{CapabilityRegistry, RegistryError, ValidationOperation};
use crate::types::{ValidationInput, ValidationResult};
use crate::ValidationError;

/// Errors surfaced by a [`ValidationManager`].
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Setup mistake: duplicate or malformed capability name.
    #[error("Service '{service}': cannot register capability '{capability}': {reason}")]
    Configuration {
        service: String,
        capability: String,
        reason: String,
    },

    #[error("Service '{service}' has no capability '{capability}' (available: {})", .available.join(", "))]
    NotFound {
        service: String,
        capability: String,
        available: Vec<String>,
    },

    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

/// A provider installs zero or more capabilities into a manager.
///
/// Providers compose by ordered application. Applying the same provider twice
/// to one manager fails on the duplicate capability name.
pub trait Provider: FnOnce(&mut ValidationManager) -> Result<(), ManagerError> {}

impl<F> Provider for F where F: FnOnce(&mut ValidationManager) -> Result<(), ManagerError> {}

/// Composes a service identity with a capability registry.
#[derive(Debug, Clone)]
pub struct ValidationManager {
    service: String,
    registry: CapabilityRegistry,
}

impl ValidationManager {
    /// Create a manager with no capabilities.
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        debug!(service = %service, "Validation manager created");
        Self {
            service,
            registry: CapabilityRegistry::new(),
        }
    }

    /// The owning service's identity.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Register a capability. The first registration of a name wins.
    pub fn register(
        &mut self,
        capability: impl Into<String>,
        operation: Arc<dyn ValidationOperation>,
    ) -> Result<(), ManagerError> {
        let capability = capability.into();
        match self.registry.register(capability.clone(), operation) {
            Ok(()) => {
                info!(service = %self.service, capability = %capability, "Capability registered");
                Ok(())
            }
            Err(e) => {
                warn!(service = %self.service, capability = %capability, error = %e, "Capability registration rejected");
                Err(ManagerError::Configuration {
                    service: self.service.clone(),
                    capability,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Apply a provider and return the manager for chaining.
    pub fn apply<P: Provider>(&mut self, provider: P) -> Result<&mut Self, ManagerError> {
        provider(&mut *self)?;
        Ok(self)
    }

    /// Run a capability against an input.
    pub fn invoke(
        &self,
        capability: &str,
        input: &ValidationInput,
    ) -> Result<ValidationResult, ManagerError> {
        debug!(service = %self.service, capability, input = input.kind(), "Invoking capability");

        let outcome = self.registry.invoke(capability, input);
        match outcome {
            Ok(result) => {
                debug!(
                    service = %self.service,
                    capability,
                    valid = result.valid,
                    errors = result.errors.len(),
                    "Capability completed"
                );
                Ok(result)
            }
            Err(RegistryError::NotFound(_)) => {
                warn!(service = %self.service, capability, "Unknown capability invoked");
                Err(ManagerError::NotFound {
                    service: self.service.clone(),
                    capability: capability.to_string(),
                    available: self.available_capabilities(),
                })
            }
            Err(RegistryError::Validation(e)) => {
                warn!(service = %self.service, capability, error = %e, "Input rejected");
                Err(ManagerError::Validation(e))
            }
            Err(e @ (RegistryError::Duplicate(_) | RegistryError::InvalidName(_))) => {
                Err(ManagerError::Configuration {
                    service: self.service.clone(),
                    capability: capability.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Names of all registered capabilities, sorted.
    pub fn available_capabilities(&self) -> Vec<String> {
        self.registry.names().into_iter().map(String::from).collect()
    }

    /// Check if a capability is registered.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.registry.has(capability)
    }
}
