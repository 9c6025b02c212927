// ABOUTME: Contract between the phase executor and per-phase work.
// ABOUTME: Handlers get a context for progress reporting, retries, and cancellation checks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::DeployError;
use super::options::DeploymentOptions;
use super::phase::PhaseName;
use super::record::Deployment;
use super::registry::Registry;
use super::state::DeploymentStatus;
use crate::retry::RetryController;
use crate::types::{BackupId, DeploymentId};

/// Result a handler returns for its phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub success: bool,
    pub message: String,
}

impl PhaseOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Everything a handler may touch while running one phase.
#[derive(Clone)]
pub struct PhaseContext {
    deployment_id: DeploymentId,
    phase: PhaseName,
    budget: Duration,
    registry: Arc<Registry>,
    retry: Arc<RetryController>,
}

impl PhaseContext {
    pub fn new(
        deployment_id: DeploymentId,
        phase: PhaseName,
        budget: Duration,
        registry: Arc<Registry>,
        retry: Arc<RetryController>,
    ) -> Self {
        Self {
            deployment_id,
            phase,
            budget,
            registry,
            retry,
        }
    }

    pub fn deployment_id(&self) -> &DeploymentId {
        &self.deployment_id
    }

    pub fn phase(&self) -> PhaseName {
        self.phase
    }

    /// Time the executor allows this handler before cutting it off.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn retry(&self) -> &RetryController {
        &self.retry
    }

    /// Report percent complete for this phase. Lower values than already
    /// reported are ignored.
    pub fn report_progress(&self, percent: u8, message: impl Into<String>) {
        if let Err(e) =
            self.registry
                .report_progress(&self.deployment_id, self.phase, percent, message)
        {
            tracing::debug!(error = %e, "dropping progress report");
        }
    }

    /// Current copy of the deployment record.
    pub fn deployment(&self) -> Result<Deployment, DeployError> {
        self.registry
            .get(&self.deployment_id)
            .ok_or_else(|| DeployError::NotFound(self.deployment_id.clone()))
    }

    pub fn options(&self) -> DeploymentOptions {
        self.registry
            .get(&self.deployment_id)
            .map(|d| DeploymentOptions::from_map(&d.options))
            .unwrap_or_default()
    }

    /// True once the deployment was paused or cancelled; handlers should
    /// stop at the next safe point.
    pub fn is_cancelled(&self) -> bool {
        !matches!(
            self.registry.status(&self.deployment_id),
            Some(DeploymentStatus::Running)
        )
    }

    /// Remember the backup a later snapshot rollback restores from.
    pub fn record_backup(&self, backup: BackupId) -> Result<(), DeployError> {
        self.registry.set_backup_id(&self.deployment_id, backup)
    }
}

/// Work performed for one phase.
#[async_trait]
pub trait PhaseHandler: Send + Sync {
    async fn handle(&self, ctx: PhaseContext) -> PhaseOutcome;
}

/// Handlers keyed by phase.
#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: HashMap<PhaseName, Arc<dyn PhaseHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, phase: PhaseName, handler: impl PhaseHandler + 'static) -> Self {
        self.register(phase, Arc::new(handler));
        self
    }

    pub fn register(&mut self, phase: PhaseName, handler: Arc<dyn PhaseHandler>) {
        self.handlers.insert(phase, handler);
    }

    pub fn get(&self, phase: PhaseName) -> Option<Arc<dyn PhaseHandler>> {
        self.handlers.get(&phase).cloned()
    }
}

impl std::fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut phases: Vec<_> = self.handlers.keys().collect();
        phases.sort();
        f.debug_struct("HandlerSet").field("phases", &phases).finish()
    }
}
