// ABOUTME: Public entry point for deployment lifecycle operations.
// ABOUTME: Wires registry, dependency gate, phase executor, rollback, and notifications.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Level;

use super::DeployError;
use super::executor::{PhaseExecutor, RunOutcome};
use super::gate::DependencyGate;
use super::handler::HandlerSet;
use super::options::{self, DeploymentOptions};
use super::phase::{PhaseCatalog, PhaseName};
use super::record::{Deployment, DeploymentSnapshot, HistoryEvent, RollbackInfo, events};
use super::registry::{Registry, RunStart};
use super::report::{self, StatusFormat};
use super::rollback::{Compensator, NoopCompensator, RollbackManager, RollbackOutcome};
use super::state::DeploymentStatus;
use crate::diagnostics::{Diagnostics, Warning};
use crate::notify::{Notification, Notifier, WebhookNotifier};
use crate::retry::{RetryController, RetryPolicy};
use crate::telemetry::{Telemetry, TracingTelemetry};
use crate::types::{DeploymentId, SessionId};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Result of a `start` call that did not fail.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub id: DeploymentId,
    /// `completed`, or `paused`/`cancelled` when interrupted.
    pub status: DeploymentStatus,
    pub overall_progress: f64,
    pub warnings: Vec<Warning>,
}

/// Builder for [`Orchestrator`]; every collaborator has a working default.
pub struct OrchestratorBuilder {
    catalog: PhaseCatalog,
    handlers: HandlerSet,
    retry_policy: RetryPolicy,
    telemetry: Arc<dyn Telemetry>,
    notifier: Arc<dyn Notifier>,
    compensator: Arc<dyn Compensator>,
    default_region: String,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            catalog: PhaseCatalog::standard(),
            handlers: HandlerSet::new(),
            retry_policy: RetryPolicy::default(),
            telemetry: Arc::new(TracingTelemetry::new()),
            notifier: Arc::new(WebhookNotifier::default()),
            compensator: Arc::new(NoopCompensator),
            default_region: DEFAULT_REGION.to_string(),
        }
    }
}

impl OrchestratorBuilder {
    pub fn catalog(mut self, catalog: PhaseCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn handlers(mut self, handlers: HandlerSet) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn compensator(mut self, compensator: Arc<dyn Compensator>) -> Self {
        self.compensator = compensator;
        self
    }

    pub fn default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }

    pub fn build(self) -> Orchestrator {
        let registry = Arc::new(Registry::new());
        let catalog = Arc::new(self.catalog);
        let retry = Arc::new(RetryController::new(
            self.retry_policy,
            Arc::clone(&self.telemetry),
        ));

        Orchestrator {
            executor: PhaseExecutor::new(
                Arc::clone(&catalog),
                self.handlers,
                Arc::clone(&registry),
                Arc::clone(&retry),
            ),
            gate: DependencyGate::new(Arc::clone(&registry)),
            rollback: RollbackManager::new(Arc::clone(&registry), self.compensator),
            catalog,
            registry,
            retry,
            telemetry: self.telemetry,
            notifier: self.notifier,
            default_region: self.default_region,
        }
    }
}

/// Deployment orchestrator. Clones share the same registry and breaker.
#[derive(Clone)]
pub struct Orchestrator {
    catalog: Arc<PhaseCatalog>,
    registry: Arc<Registry>,
    retry: Arc<RetryController>,
    executor: PhaseExecutor,
    gate: DependencyGate,
    rollback: RollbackManager,
    telemetry: Arc<dyn Telemetry>,
    notifier: Arc<dyn Notifier>,
    default_region: String,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("phases", &self.catalog.len())
            .field("default_region", &self.default_region)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn catalog(&self) -> &PhaseCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn retry(&self) -> &Arc<RetryController> {
        &self.retry
    }

    /// Register a deployment in `pending` with default options plus `overrides`.
    ///
    /// # Errors
    ///
    /// - `DeployError::Validation` if the id is blank or holds commas or
    ///   whitespace, the stack name or type is blank, or a dependency list
    ///   would form a cycle.
    /// - `DeployError::InvalidOption` for unparsable typed option values.
    /// - `DeployError::AlreadyExists` if the id has a live session.
    pub fn init(
        &self,
        id: &str,
        stack_name: &str,
        deployment_type: &str,
        overrides: &BTreeMap<String, String>,
    ) -> Result<DeploymentId, DeployError> {
        let id = DeploymentId::parse(id).map_err(|e| DeployError::Validation(e.to_string()))?;
        for (field, value) in [("stack name", stack_name), ("deployment type", deployment_type)] {
            if value.trim().is_empty() {
                return Err(DeployError::Validation(format!("{field} must not be empty")));
            }
        }

        let now = Utc::now().timestamp();
        let mut deployment = Deployment {
            session_id: SessionId::derive(&id, now),
            id: id.clone(),
            stack_name: stack_name.trim().to_string(),
            deployment_type: deployment_type.trim().to_string(),
            status: DeploymentStatus::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            current_phase: None,
            overall_progress: 0.0,
            region: self.default_region.clone(),
            options: options::defaults(),
            dependencies: Vec::new(),
            rollback_info: RollbackInfo::default(),
            metrics: BTreeMap::new(),
        };

        for (key, value) in overrides {
            self.apply_option(&mut deployment, key, value)?;
        }

        self.registry.insert(deployment, self.catalog.names())?;
        tracing::info!(deployment = %id, "deployment initialized");
        Ok(id)
    }

    /// Set one option on a deployment that is not running or finished.
    pub fn configure(&self, id: &DeploymentId, key: &str, value: &str) -> Result<(), DeployError> {
        let mut staged = self
            .registry
            .get(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;
        ensure_configurable(&staged)?;
        self.apply_option(&mut staged, key, value)?;

        self.registry.update(id, |d| {
            ensure_configurable(d)?;
            d.options = staged.options;
            d.dependencies = staged.dependencies;
            d.rollback_info.strategy = staged.rollback_info.strategy;
            d.region = staged.region;
            Ok(())
        })?;
        self.registry
            .append_history(id, events::CONFIGURED, format!("{key}={value}"))
    }

    fn apply_option(
        &self,
        deployment: &mut Deployment,
        key: &str,
        value: &str,
    ) -> Result<(), DeployError> {
        match key {
            options::DEPENDENCIES => {
                let dependencies: Vec<DeploymentId> = options::parse_dependencies(value)
                    .into_iter()
                    .map(DeploymentId::new)
                    .collect();
                self.gate.ensure_acyclic(&deployment.id, &dependencies)?;
                deployment.dependencies = dependencies;
            }
            options::ROLLBACK_STRATEGY => {
                let strategy = value.trim();
                if strategy.is_empty() {
                    return Err(DeployError::InvalidOption {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
                deployment.rollback_info.strategy = strategy.to_string();
            }
            options::REGION => {
                if !value.trim().is_empty() {
                    deployment.region = value.trim().to_string();
                }
            }
            _ => {
                options::validate(key, value)?;
                deployment.options.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Run a deployment's phases.
    ///
    /// Starts a pending deployment or resumes a paused one; with `force`, a
    /// failed run restarts from the first phase. On phase failure the
    /// deployment is rolled back when `rollbackEnabled` is set.
    ///
    /// # Errors
    ///
    /// - `DeployError::NotFound`, `DeployError::NotStartable`, or
    ///   `DeployError::DependencyNotMet` before any phase runs.
    /// - `DeployError::PhaseFailed` once the run failed; the deployment is
    ///   `failed` or `rolled_back`.
    /// - Any registry error that aborted the executor; the deployment goes
    ///   through the same failure handling first.
    ///
    /// A pause or cancel that arrives before the run settles wins: the report
    /// carries `paused` or `cancelled` and no rollback runs.
    pub async fn start(&self, id: &DeploymentId, force: bool) -> Result<RunReport, DeployError> {
        let status = self
            .registry
            .status(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;
        let startable = matches!(status, DeploymentStatus::Pending | DeploymentStatus::Paused)
            || (force && status == DeploymentStatus::Failed);
        if !startable {
            return Err(DeployError::NotStartable {
                id: id.clone(),
                status,
            });
        }

        self.gate.check(id)?;
        let start = self.registry.begin_run(id, force)?;
        if start == RunStart::Resumed {
            tracing::info!(deployment = %id, "resuming deployment");
        }

        let timer = format!("deployment:{id}");
        self.telemetry.start_timer(&timer);
        let mut diagnostics = Diagnostics::default();

        let outcome = match self.executor.run(id, &mut diagnostics).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.telemetry.stop_timer(&timer);
                tracing::error!(deployment = %id, error = %e, "phase executor aborted");
                self.fail_run(id, None, &e.to_string(), &mut diagnostics).await;
                return Err(e);
            }
        };
        let elapsed = self.telemetry.stop_timer(&timer).unwrap_or_default();

        match outcome {
            RunOutcome::Completed => {
                let settled = self.settle(
                    id,
                    DeploymentStatus::Completed,
                    (
                        events::COMPLETED,
                        format!("deployment completed in {elapsed:.1}s"),
                    ),
                )?;
                if !settled {
                    return self.report(id, diagnostics);
                }
                self.telemetry.event(
                    Level::INFO,
                    "deployment completed",
                    &[("deployment", id.to_string()), ("elapsed", format!("{elapsed:.1}"))],
                );
                self.notify(id, events::COMPLETED, "deployment completed", &mut diagnostics)
                    .await;
                self.report(id, diagnostics)
            }
            RunOutcome::Interrupted(_) => self.report(id, diagnostics),
            RunOutcome::Failed { phase, message } => {
                let Some(rolled_back) = self
                    .fail_run(id, Some(phase), &message, &mut diagnostics)
                    .await
                else {
                    return self.report(id, diagnostics);
                };
                Err(DeployError::PhaseFailed {
                    id: id.clone(),
                    phase,
                    message,
                    rolled_back,
                })
            }
        }
    }

    /// Move a finished run to `to`.
    ///
    /// Returns `false` when a pause or cancel landed after the executor's last
    /// status check; the deployment keeps that status.
    fn settle(
        &self,
        id: &DeploymentId,
        to: DeploymentStatus,
        event: (&str, String),
    ) -> Result<bool, DeployError> {
        match self.registry.transition(id, to, event) {
            Ok(_) => Ok(true),
            Err(DeployError::InvalidTransition {
                from: from @ (DeploymentStatus::Paused | DeploymentStatus::Cancelled),
                ..
            }) => {
                tracing::info!(deployment = %id, status = %from, target = %to, "run interrupted before it settled");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Mark a run failed, then roll back and notify.
    ///
    /// Returns `None` when the run was interrupted instead, otherwise whether
    /// a rollback action was taken.
    async fn fail_run(
        &self,
        id: &DeploymentId,
        phase: Option<PhaseName>,
        message: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<bool> {
        let event_message = match phase {
            Some(phase) => format!("{phase} failed: {message}"),
            None => format!("run aborted: {message}"),
        };
        match self.settle(id, DeploymentStatus::Failed, (events::FAILED, event_message)) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::warn!(deployment = %id, error = %e, "could not mark deployment failed");
                return Some(false);
            }
        }

        let mut fields = vec![("deployment", id.to_string())];
        if let Some(phase) = phase {
            fields.push(("phase", phase.to_string()));
        }
        fields.push(("message", message.to_string()));
        self.telemetry.event(Level::ERROR, "deployment failed", &fields);

        let rolled_back = self.rollback_after_failure(id, diagnostics).await;
        self.notify(id, events::FAILED, message, diagnostics).await;
        Some(rolled_back)
    }

    async fn rollback_after_failure(&self, id: &DeploymentId, diagnostics: &mut Diagnostics) -> bool {
        let enabled = self
            .registry
            .get(id)
            .map(|d| DeploymentOptions::from_map(&d.options).rollback_enabled)
            .unwrap_or(false);
        if !enabled {
            return false;
        }

        match self.rollback.rollback(id, false, diagnostics).await {
            Ok(outcome) => outcome != RollbackOutcome::Skipped,
            Err(e) => {
                diagnostics.warn(Warning::rollback_failed(format!("{id}: {e}")));
                false
            }
        }
    }

    async fn notify(
        &self,
        id: &DeploymentId,
        event_type: &str,
        message: &str,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(deployment) = self.registry.get(id) else {
            return;
        };
        let options = DeploymentOptions::from_map(&deployment.options);
        let Some(target) = options.notification_target() else {
            return;
        };

        let notification = Notification::for_deployment(&deployment, event_type, message);
        if let Err(e) = self.notifier.notify(target, &notification).await {
            diagnostics.warn(Warning::notification_failed(format!(
                "{id}: notification to {target} failed: {e}"
            )));
        }
    }

    fn report(&self, id: &DeploymentId, diagnostics: Diagnostics) -> Result<RunReport, DeployError> {
        let deployment = self
            .registry
            .get(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;
        Ok(RunReport {
            id: id.clone(),
            status: deployment.status,
            overall_progress: deployment.overall_progress,
            warnings: diagnostics.into_warnings(),
        })
    }

    /// Run `start` on its own task.
    pub fn spawn(&self, id: DeploymentId, force: bool) -> JoinHandle<Result<RunReport, DeployError>> {
        let this = self.clone();
        tokio::spawn(async move { this.start(&id, force).await })
    }

    /// Ask a running deployment to stop before its next phase.
    pub fn pause(&self, id: &DeploymentId) -> Result<(), DeployError> {
        self.registry
            .transition(
                id,
                DeploymentStatus::Paused,
                (events::PAUSED, "pause requested".to_string()),
            )
            .map(|_| ())
    }

    /// Cancel a deployment; cancelled is terminal.
    pub fn cancel(&self, id: &DeploymentId) -> Result<(), DeployError> {
        self.registry
            .transition(
                id,
                DeploymentStatus::Cancelled,
                (events::CANCELLED, "deployment cancelled".to_string()),
            )
            .map(|_| ())
    }

    /// Continue a paused deployment, skipping phases that already completed.
    pub async fn resume(&self, id: &DeploymentId) -> Result<RunReport, DeployError> {
        let status = self
            .registry
            .status(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;
        if status != DeploymentStatus::Paused {
            return Err(DeployError::NotStartable {
                id: id.clone(),
                status,
            });
        }
        self.start(id, false).await
    }

    /// Roll back a failed deployment.
    pub async fn rollback(
        &self,
        id: &DeploymentId,
        force: bool,
    ) -> Result<RollbackOutcome, DeployError> {
        let mut diagnostics = Diagnostics::default();
        self.rollback.rollback(id, force, &mut diagnostics).await
    }

    /// Render status in the requested format. Never mutates state.
    pub fn status(&self, id: &DeploymentId, format: StatusFormat) -> Result<String, DeployError> {
        report::render(&self.snapshot(id)?, format)
    }

    pub fn snapshot(&self, id: &DeploymentId) -> Result<DeploymentSnapshot, DeployError> {
        self.registry
            .snapshot(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))
    }

    pub fn history(&self, id: &DeploymentId) -> Result<Vec<HistoryEvent>, DeployError> {
        self.registry
            .history(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))
    }

    pub fn get(&self, id: &DeploymentId) -> Option<Deployment> {
        self.registry.get(id)
    }

    pub fn list(&self) -> Vec<(DeploymentId, DeploymentStatus)> {
        self.registry.list()
    }
}

fn ensure_configurable(deployment: &Deployment) -> Result<(), DeployError> {
    let status = deployment.status;
    if status == DeploymentStatus::Running || status.is_terminal() {
        return Err(DeployError::Validation(format!(
            "deployment {} cannot be configured while {status}",
            deployment.id
        )));
    }
    Ok(())
}
