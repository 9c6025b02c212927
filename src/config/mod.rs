// ABOUTME: Configuration types and parsing for rollwright.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and per-deployment option overrides.

mod deserialize;
mod env_value;
mod init;
mod phases;

pub use env_value::{EnvValue, ScalarValue, resolve_step_env};
pub use init::init_config;
pub use phases::{
    PhaseTimeouts, PhasesConfig, PreparationConfig, StepConfig, ValidationConfig,
};

use crate::deploy::{DEFAULT_REGION, options};
use crate::error::{Error, Result};
use crate::handlers::CommandCompensator;
use crate::retry::RetryPolicy;
use crate::types::DeploymentId;
use deserialize::{deserialize_deployments, deserialize_id_list, deserialize_non_blank};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub const CONFIG_FILENAME: &str = "rollwright.yml";
pub const CONFIG_FILENAME_ALT: &str = "rollwright.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".rollwright/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub notifications: Option<NotificationsConfig>,

    #[serde(default)]
    pub phases: PhasesConfig,

    #[serde(default)]
    pub rollback: RollbackConfig,

    #[serde(deserialize_with = "deserialize_deployments")]
    pub deployments: NonEmpty<DeploymentConfig>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_true() -> bool {
    true
}

/// Webhook applied to every deployment unless its options override it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsConfig {
    pub webhook_url: EnvValue,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Compensating commands per rollback strategy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollbackConfig {
    #[serde(default)]
    pub recreate: Option<String>,
    #[serde(default)]
    pub snapshot: Option<String>,
    #[serde(default, alias = "blue-green")]
    pub blue_green: Option<String>,
}

impl RollbackConfig {
    pub fn compensator(&self) -> CommandCompensator {
        CommandCompensator::new(
            self.recreate.clone(),
            self.snapshot.clone(),
            self.blue_green.clone(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentConfig {
    #[serde(deserialize_with = "deserialize_non_blank")]
    pub id: String,

    #[serde(deserialize_with = "deserialize_non_blank")]
    pub stack: String,

    #[serde(rename = "type", deserialize_with = "deserialize_non_blank")]
    pub deployment_type: String,

    #[serde(default)]
    pub options: BTreeMap<String, ScalarValue>,

    #[serde(default, deserialize_with = "deserialize_id_list")]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub rollback_strategy: Option<String>,

    #[serde(default)]
    pub region: Option<String>,
}

impl Manifest {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(yaml)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for deployment in self.deployments.iter() {
            DeploymentId::parse(&deployment.id).map_err(|e| Error::InvalidConfig(e.to_string()))?;
            if !ids.insert(deployment.id.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate deployment id '{}'",
                    deployment.id
                )));
            }
        }

        for deployment in self.deployments.iter() {
            for dependency in &deployment.dependencies {
                if dependency == &deployment.id {
                    return Err(Error::InvalidConfig(format!(
                        "deployment '{}' depends on itself",
                        deployment.id
                    )));
                }
                if !ids.contains(dependency.as_str()) {
                    return Err(Error::InvalidConfig(format!(
                        "deployment '{}' depends on unknown deployment '{dependency}'",
                        deployment.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn deployment(&self, id: &str) -> Option<&DeploymentConfig> {
        self.deployments.iter().find(|d| d.id == id)
    }

    /// Option map passed to `init` for one deployment.
    ///
    /// Manifest-wide notifications come first so deployment options win.
    pub fn overrides_for(&self, deployment: &DeploymentConfig) -> Result<BTreeMap<String, String>> {
        let mut overrides = BTreeMap::new();

        if let Some(ref notifications) = self.notifications {
            overrides.insert(
                options::NOTIFICATIONS_ENABLED.to_string(),
                notifications.enabled.to_string(),
            );
            overrides.insert(
                options::WEBHOOK_URL.to_string(),
                notifications.webhook_url.resolve("notifications.webhook_url")?,
            );
        }

        for (key, value) in &deployment.options {
            overrides.insert(key.clone(), value.resolve(key)?);
        }

        if !deployment.dependencies.is_empty() {
            overrides.insert(
                options::DEPENDENCIES.to_string(),
                deployment.dependencies.join(","),
            );
        }
        if let Some(ref strategy) = deployment.rollback_strategy {
            overrides.insert(options::ROLLBACK_STRATEGY.to_string(), strategy.clone());
        }
        if let Some(ref region) = deployment.region {
            overrides.insert(options::REGION.to_string(), region.clone());
        }

        Ok(overrides)
    }

    pub fn template() -> Self {
        Manifest {
            region: default_region(),
            retry: RetryPolicy::default(),
            notifications: None,
            phases: PhasesConfig::default(),
            rollback: RollbackConfig::default(),
            deployments: NonEmpty::new(DeploymentConfig {
                id: "my-app".to_string(),
                stack: "my-app-stack".to_string(),
                deployment_type: "simple".to_string(),
                options: BTreeMap::new(),
                dependencies: Vec::new(),
                rollback_strategy: None,
                region: None,
            }),
        }
    }
}
