//! XML document capability backed by an external validator.

use std::sync::Arc;

use crate::manager::{ManagerError, Provider, ValidationManager};
use crate::types::{ValidationInput, ValidationResult};
use crate::ValidationError;

use super::XML_DOCUMENT;

/// An opaque document validator (for example an XSD engine).
///
/// Warden does not inspect schema content; it only routes documents to the
/// validator and passes its result back. Closures of the right shape
/// implement this trait.
pub trait DocumentValidator: Send + Sync {
    fn validate_document(&self, document: &str) -> ValidationResult;
}

impl<F> DocumentValidator for F
where
    F: Fn(&str) -> ValidationResult + Send + Sync,
{
    fn validate_document(&self, document: &str) -> ValidationResult {
        self(document)
    }
}

/// Register `xml_document`, delegating `Text` input to `validator`.
pub fn register_xml_validation(
    manager: &mut ValidationManager,
    validator: Arc<dyn DocumentValidator>,
) -> Result<(), ManagerError> {
    let service = manager.service().to_string();
    manager.register(
        XML_DOCUMENT,
        Arc::new(move |input: &ValidationInput| -> Result<ValidationResult, ValidationError> {
            match input {
                ValidationInput::Text(document) => Ok(validator
                    .validate_document(document)
                    .with_metadata("service", &service)
                    .with_metadata("capability", XML_DOCUMENT)),
                other => Err(ValidationError::UnsupportedInput {
                    capability: XML_DOCUMENT.to_string(),
                    kind: other.kind(),
                }),
            }
        }),
    )
}

/// Provider form of [`register_xml_validation`].
pub fn xml_validation(validator: Arc<dyn DocumentValidator>) -> impl Provider {
    move |manager: &mut ValidationManager| register_xml_validation(manager, validator)
}
