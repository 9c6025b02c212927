// ABOUTME: Manifest sections for phase commands and phase timeout overrides.
// ABOUTME: Resolves into the handler plan and phase catalog used at run time.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::env_value::{EnvValue, resolve_step_env};
use crate::deploy::{PhaseCatalog, PhaseName, PhaseSpec};
use crate::error::{Error, Result};
use crate::handlers::{PhasePlan, Step};
use crate::retry::ServiceClass;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Command proving the credentials work.
    #[serde(default)]
    pub credentials: Option<String>,
    /// Command failing when resource quota is exhausted.
    #[serde(default)]
    pub quota: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreparationConfig {
    #[serde(default)]
    pub backup: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub name: String,
    pub run: String,
    #[serde(default)]
    pub service: ServiceClass,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub env: HashMap<String, EnvValue>,
}

impl StepConfig {
    fn resolve(&self) -> Result<Step> {
        if self.name.trim().is_empty() || self.run.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "steps need a non-empty name and run command".to_string(),
            ));
        }
        Ok(Step {
            name: self.name.clone(),
            run: self.run.clone(),
            service: self.service,
            max_attempts: self.max_attempts,
            env: resolve_step_env(&self.name, &self.env)?,
        })
    }
}

/// Per-phase timeout overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseTimeouts {
    #[serde(default, with = "humantime_serde")]
    pub validation: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub preparation: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub infrastructure: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub application: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub verification: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub cleanup: Option<Duration>,
}

impl PhaseTimeouts {
    fn get(&self, phase: PhaseName) -> Option<Duration> {
        match phase {
            PhaseName::Validation => self.validation,
            PhaseName::Preparation => self.preparation,
            PhaseName::Infrastructure => self.infrastructure,
            PhaseName::Application => self.application,
            PhaseName::Verification => self.verification,
            PhaseName::Cleanup => self.cleanup,
        }
    }
}

/// The `phases` section of the manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhasesConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub preparation: PreparationConfig,
    #[serde(default)]
    pub infrastructure: Vec<StepConfig>,
    #[serde(default)]
    pub application: Vec<StepConfig>,
    #[serde(default)]
    pub verification: Vec<StepConfig>,
    #[serde(default)]
    pub cleanup: Vec<StepConfig>,
    #[serde(default)]
    pub timeouts: PhaseTimeouts,
}

fn resolve_steps(steps: &[StepConfig]) -> Result<Vec<Step>> {
    steps.iter().map(StepConfig::resolve).collect()
}

impl PhasesConfig {
    /// Resolve commands and step environments.
    pub fn plan(&self) -> Result<PhasePlan> {
        Ok(PhasePlan {
            credentials_probe: self.validation.credentials.clone(),
            quota_probe: self.validation.quota.clone(),
            backup_command: self.preparation.backup.clone(),
            infrastructure: resolve_steps(&self.infrastructure)?,
            application: resolve_steps(&self.application)?,
            verification: resolve_steps(&self.verification)?,
            cleanup: resolve_steps(&self.cleanup)?,
        })
    }

    /// Standard catalog with timeout overrides applied.
    pub fn catalog(&self) -> Result<PhaseCatalog> {
        let specs = PhaseCatalog::standard()
            .iter()
            .map(|spec| PhaseSpec {
                timeout: self.timeouts.get(spec.name).unwrap_or(spec.timeout),
                ..spec.clone()
            })
            .collect();
        PhaseCatalog::new(specs).map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}
