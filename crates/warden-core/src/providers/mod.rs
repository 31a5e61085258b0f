//! Providers: functions that install capabilities into a manager.
//!
//! Each provider is a plain function of the manager whose only side effect is
//! registering capabilities. Services pick the providers they need:
//!
//! ```rust,ignore
//! use warden_core::providers::{json_validation, register_agent_governance_validation};
//!
//! let mut manager = ValidationManager::new("ai_trading_service");
//! manager
//!     .apply(json_validation(&order_schema))?
//!     .apply(register_agent_governance_validation)?;
//! ```

mod document;
mod governance;
mod json;

pub use document::{register_xml_validation, xml_validation, DocumentValidator};
pub use governance::{
    agent_governance_with, default_contract_set, register_agent_governance_validation,
    register_agent_governance_with, GovernanceOperation, DEFAULT_ALPHABET,
};
pub use json::{json_validation, register_json_validation, JsonSchemaError, JsonSchemaValidator, MAX_DEPTH};

use serde_json::Value;

use crate::manager::{ManagerError, ValidationManager};

/// Capability key for XML documents.
pub const XML_DOCUMENT: &str = "xml_document";

/// Capability key for JSON API payloads.
pub const JSON_PAYLOAD: &str = "json_payload";

/// Capability key for agent execution traces.
pub const AGENT_EXECUTION: &str = "agent_execution";

/// Register both document capabilities: XML through an external validator,
/// JSON against `schema`.
pub fn register_common_validation(
    manager: &mut ValidationManager,
    xml: std::sync::Arc<dyn DocumentValidator>,
    schema: &Value,
) -> Result<(), ManagerError> {
    register_xml_validation(manager, xml)?;
    register_json_validation(manager, schema)
}
