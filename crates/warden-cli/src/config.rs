//! Service configuration: which capabilities a manager gets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use warden_core::providers::{
    register_agent_governance_validation, register_agent_governance_with,
    register_json_validation, register_xml_validation,
};
use warden_core::{ContractSet, ValidationManager};

use crate::xml::WellFormedXml;

/// A service and the capabilities it installs.
///
/// ```yaml
/// service: ai_trading_service
/// xml: true
/// json_schema: schemas/order.json
/// agent_governance: true
/// contracts: contracts/trading.yaml
/// ```
///
/// Relative paths resolve against the config file's directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub service: String,

    #[serde(default)]
    pub xml: bool,

    #[serde(default)]
    pub json_schema: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub agent_governance: bool,

    /// Contract set for `agent_execution`; the built-in set when absent
    #[serde(default)]
    pub contracts: Option<PathBuf>,

    #[serde(skip)]
    base: PathBuf,
}

fn default_true() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service: "warden".to_string(),
            xml: false,
            json_schema: None,
            agent_governance: true,
            contracts: None,
            base: PathBuf::new(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: ServiceConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// The given config file, or the default governance-only service.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }

    /// Build a manager with exactly the configured capabilities.
    pub fn build_manager(&self) -> Result<ValidationManager> {
        let mut manager = ValidationManager::new(&self.service);

        if self.xml {
            register_xml_validation(&mut manager, Arc::new(WellFormedXml))?;
        }

        if let Some(schema) = &self.json_schema {
            let path = self.resolve(schema);
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading JSON schema {}", path.display()))?;
            let schema: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing JSON schema {}", path.display()))?;
            register_json_validation(&mut manager, &schema)?;
        }

        if self.agent_governance {
            match &self.contracts {
                Some(contracts) => {
                    let path = self.resolve(contracts);
                    let set = ContractSet::from_file(&path)
                        .with_context(|| format!("loading contracts {}", path.display()))?;
                    register_agent_governance_with(&mut manager, set)?;
                }
                None => register_agent_governance_validation(&mut manager)?,
            }
        }

        debug!(
            service = %self.service,
            capabilities = ?manager.available_capabilities(),
            "Manager built from config"
        );
        Ok(manager)
    }
}
