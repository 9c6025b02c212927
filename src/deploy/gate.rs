// ABOUTME: Dependency gate checked before a deployment may start.
// ABOUTME: Also detects dependency cycles when dependencies are configured.

use std::collections::HashSet;
use std::sync::Arc;

use super::DeployError;
use super::registry::Registry;
use super::state::DeploymentStatus;
use crate::types::DeploymentId;

/// Status string reported for a dependency the registry does not know.
pub const MISSING_DEPENDENCY: &str = "not_found";

/// Admits a deployment only when every dependency has completed.
#[derive(Debug, Clone)]
pub struct DependencyGate {
    registry: Arc<Registry>,
}

impl DependencyGate {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Check dependencies in declaration order; the first unmet one is reported.
    pub fn check(&self, id: &DeploymentId) -> Result<(), DeployError> {
        let deployment = self
            .registry
            .get(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;

        for dependency in &deployment.dependencies {
            let status = self.registry.status(dependency);
            if status == Some(DeploymentStatus::Completed) {
                continue;
            }
            let status = status.map_or(MISSING_DEPENDENCY, |s| s.as_str()).to_string();
            tracing::debug!(deployment = %id, %dependency, %status, "dependency not met");
            return Err(DeployError::DependencyNotMet {
                id: id.clone(),
                dependency: dependency.clone(),
                status,
            });
        }
        Ok(())
    }

    /// Reject `dependencies` for `id` if they would close a cycle.
    ///
    /// Unknown dependencies are allowed here; the start-time check reports them.
    pub fn ensure_acyclic(
        &self,
        id: &DeploymentId,
        dependencies: &[DeploymentId],
    ) -> Result<(), DeployError> {
        if dependencies.contains(id) {
            return Err(DeployError::Validation(format!(
                "deployment {id} cannot depend on itself"
            )));
        }

        let mut seen = HashSet::new();
        let mut stack: Vec<DeploymentId> = dependencies.to_vec();
        while let Some(next) = stack.pop() {
            if &next == id {
                return Err(DeployError::Validation(format!(
                    "dependency cycle through {id}"
                )));
            }
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(record) = self.registry.get(&next) {
                stack.extend(record.dependencies);
            }
        }
        Ok(())
    }
}
