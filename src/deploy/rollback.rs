// ABOUTME: Rollback of failed deployments via pluggable compensating actions.
// ABOUTME: Supports recreate, snapshot restore, and blue-green traffic switching.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::DeployError;
use super::record::{Deployment, events};
use super::registry::Registry;
use super::state::DeploymentStatus;
use crate::diagnostics::{Diagnostics, Warning};
use crate::types::{BackupId, DeploymentId};

/// Known compensating strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackStrategy {
    Recreate,
    Snapshot,
    BlueGreen,
}

impl RollbackStrategy {
    /// Resolve a strategy name; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "recreate" => Some(Self::Recreate),
            "snapshot" => Some(Self::Snapshot),
            "blue_green" | "blue-green" => Some(Self::BlueGreen),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recreate => "recreate",
            Self::Snapshot => "snapshot",
            Self::BlueGreen => "blue_green",
        }
    }
}

impl fmt::Display for RollbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-side compensating actions.
///
/// Each method returns a human-readable failure reason on error.
#[async_trait]
pub trait Compensator: Send + Sync {
    async fn recreate(&self, deployment: &Deployment) -> Result<(), String>;

    async fn restore_snapshot(
        &self,
        deployment: &Deployment,
        backup: &BackupId,
    ) -> Result<(), String>;

    async fn switch_traffic(&self, deployment: &Deployment) -> Result<(), String>;
}

/// Compensator that performs no provider work.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCompensator;

#[async_trait]
impl Compensator for NoopCompensator {
    async fn recreate(&self, deployment: &Deployment) -> Result<(), String> {
        tracing::debug!(deployment = %deployment.id, "recreate: nothing to do");
        Ok(())
    }

    async fn restore_snapshot(&self, deployment: &Deployment, backup: &BackupId) -> Result<(), String> {
        tracing::debug!(deployment = %deployment.id, %backup, "restore: nothing to do");
        Ok(())
    }

    async fn switch_traffic(&self, deployment: &Deployment) -> Result<(), String> {
        tracing::debug!(deployment = %deployment.id, "switch: nothing to do");
        Ok(())
    }
}

/// Result of a rollback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The deployment was already rolled back and force was not set.
    Skipped,
    RolledBack {
        strategy: String,
        /// False when the strategy was unknown and nothing was executed.
        action_taken: bool,
    },
}

/// Drives a deployment through `rolling_back` to `rolled_back`.
#[derive(Clone)]
pub struct RollbackManager {
    registry: Arc<Registry>,
    compensator: Arc<dyn Compensator>,
}

impl fmt::Debug for RollbackManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollbackManager").finish_non_exhaustive()
    }
}

impl RollbackManager {
    pub fn new(registry: Arc<Registry>, compensator: Arc<dyn Compensator>) -> Self {
        Self {
            registry,
            compensator,
        }
    }

    /// Roll back a failed deployment.
    ///
    /// A deployment already rolled back is left alone unless `force` is set.
    ///
    /// # Errors
    ///
    /// - `DeployError::NotFound` for unknown ids.
    /// - `DeployError::InvalidTransition` when the deployment is not failed.
    /// - `DeployError::RollbackFailed` when the compensating action fails; the
    ///   deployment returns to `failed`.
    pub async fn rollback(
        &self,
        id: &DeploymentId,
        force: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<RollbackOutcome, DeployError> {
        let status = self
            .registry
            .status(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;

        let started = (
            events::ROLLBACK_STARTED,
            "rollback started".to_string(),
        );
        match status {
            DeploymentStatus::RolledBack if !force => {
                tracing::warn!(deployment = %id, "already rolled back; skipping");
                return Ok(RollbackOutcome::Skipped);
            }
            DeploymentStatus::RolledBack => self.registry.reopen_for_rollback(id, started)?,
            _ => {
                self.registry
                    .transition(id, DeploymentStatus::RollingBack, started)?;
            }
        }

        let deployment = self
            .registry
            .get(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;
        let name = deployment.rollback_info.strategy.clone();

        let result = match RollbackStrategy::from_name(&name) {
            Some(strategy) => {
                tracing::info!(deployment = %id, %strategy, "running compensating action");
                self.compensate(strategy, &deployment).await.map(|()| true)
            }
            None => {
                diagnostics.warn(Warning::unknown_rollback_strategy(format!(
                    "{id}: unknown rollback strategy '{name}', no action taken"
                )));
                Ok(false)
            }
        };

        match result {
            Ok(action_taken) => {
                self.registry.transition(
                    id,
                    DeploymentStatus::RolledBack,
                    (
                        events::ROLLBACK_COMPLETED,
                        format!("rolled back using {name}"),
                    ),
                )?;
                Ok(RollbackOutcome::RolledBack {
                    strategy: name,
                    action_taken,
                })
            }
            Err(message) => {
                self.registry.transition(
                    id,
                    DeploymentStatus::Failed,
                    (events::ROLLBACK_FAILED, message.clone()),
                )?;
                Err(DeployError::RollbackFailed {
                    id: id.clone(),
                    message,
                })
            }
        }
    }

    async fn compensate(
        &self,
        strategy: RollbackStrategy,
        deployment: &Deployment,
    ) -> Result<(), String> {
        match strategy {
            RollbackStrategy::Recreate => self.compensator.recreate(deployment).await,
            RollbackStrategy::Snapshot => {
                let backup = deployment
                    .rollback_info
                    .backup_id
                    .as_ref()
                    .ok_or_else(|| "snapshot rollback requires a recorded backup".to_string())?;
                self.compensator.restore_snapshot(deployment, backup).await
            }
            RollbackStrategy::BlueGreen => self.compensator.switch_traffic(deployment).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_resolve() {
        assert_eq!(RollbackStrategy::from_name("recreate"), Some(RollbackStrategy::Recreate));
        assert_eq!(RollbackStrategy::from_name("snapshot"), Some(RollbackStrategy::Snapshot));
        assert_eq!(RollbackStrategy::from_name("blue-green"), Some(RollbackStrategy::BlueGreen));
        assert_eq!(RollbackStrategy::from_name("blue_green"), Some(RollbackStrategy::BlueGreen));
        assert_eq!(RollbackStrategy::from_name("pray"), None);
    }
}
