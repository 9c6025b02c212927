// ABOUTME: Runs catalog phases in order for one deployment.
// ABOUTME: Enforces per-phase and overall timeouts and records phase results.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::DeployError;
use super::handler::{HandlerSet, PhaseContext, PhaseOutcome};
use super::options::DeploymentOptions;
use super::phase::{PhaseCatalog, PhaseSpec};
use super::record::result_codes;
use super::registry::{PhaseResult, Registry};
use super::state::{DeploymentStatus, PhaseStatus};
use crate::diagnostics::{Diagnostics, Warning};
use crate::retry::RetryController;
use crate::types::DeploymentId;

/// How a call to [`PhaseExecutor::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every phase finished and no fatal failure occurred.
    Completed,
    /// The deployment left `running` (paused or cancelled) mid-run.
    Interrupted(DeploymentStatus),
    /// A required phase failed, or any phase failed under `failFast`.
    Failed {
        phase: super::phase::PhaseName,
        message: String,
    },
}

/// Drives handlers through the phase catalog.
#[derive(Debug, Clone)]
pub struct PhaseExecutor {
    catalog: Arc<PhaseCatalog>,
    handlers: HandlerSet,
    registry: Arc<Registry>,
    retry: Arc<RetryController>,
}

impl PhaseExecutor {
    pub fn new(
        catalog: Arc<PhaseCatalog>,
        handlers: HandlerSet,
        registry: Arc<Registry>,
        retry: Arc<RetryController>,
    ) -> Self {
        Self {
            catalog,
            handlers,
            registry,
            retry,
        }
    }

    /// Execute every phase not yet finished, in catalog order.
    ///
    /// Phases already completed (or optional phases already failed) are
    /// skipped, so a resumed run continues where it stopped. The caller owns
    /// the deployment status transitions around the run.
    pub async fn run(
        &self,
        id: &DeploymentId,
        diagnostics: &mut Diagnostics,
    ) -> Result<RunOutcome, DeployError> {
        let deployment = self
            .registry
            .get(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;
        let options = DeploymentOptions::from_map(&deployment.options);
        let run_started = Instant::now();

        for spec in self.catalog.iter() {
            let status = self
                .registry
                .status(id)
                .ok_or_else(|| DeployError::NotFound(id.clone()))?;
            if status != DeploymentStatus::Running {
                tracing::info!(deployment = %id, %status, "run interrupted");
                return Ok(RunOutcome::Interrupted(status));
            }

            let previous = self.registry.phase(id, spec.name).unwrap_or_default();
            match previous.status {
                PhaseStatus::Completed => continue,
                PhaseStatus::Failed if !spec.required => continue,
                _ => {}
            }

            let remaining = options.timeout.saturating_sub(run_started.elapsed());
            let budget = spec.timeout.min(remaining);

            self.registry.set_current_phase(id, spec.name)?;
            self.registry.start_phase(id, spec.name)?;
            tracing::info!(deployment = %id, phase = %spec.name, budget_secs = budget.as_secs(), "phase started");

            let started = Instant::now();
            let (outcome, result_code) = if budget.is_zero() {
                (
                    PhaseOutcome::failure(format!(
                        "deployment timeout of {}s exhausted before {}",
                        options.timeout.as_secs(),
                        spec.name
                    )),
                    result_codes::TIMEOUT,
                )
            } else {
                self.invoke(id, spec, budget).await
            };
            let execution_time = started.elapsed().as_secs_f64();

            let status = self
                .registry
                .status(id)
                .ok_or_else(|| DeployError::NotFound(id.clone()))?;
            if status != DeploymentStatus::Running {
                if outcome.success {
                    self.finish(id, spec, &outcome, execution_time, budget, result_code)?;
                } else {
                    self.registry
                        .reset_phase(id, spec.name, format!("interrupted: {}", outcome.message))?;
                }
                tracing::info!(deployment = %id, phase = %spec.name, %status, "run interrupted");
                return Ok(RunOutcome::Interrupted(status));
            }

            self.finish(id, spec, &outcome, execution_time, budget, result_code)?;

            if outcome.success {
                tracing::info!(deployment = %id, phase = %spec.name, execution_time, "phase completed");
                continue;
            }

            if spec.required || options.fail_fast {
                tracing::error!(deployment = %id, phase = %spec.name, message = %outcome.message, "phase failed");
                return Ok(RunOutcome::Failed {
                    phase: spec.name,
                    message: outcome.message,
                });
            }

            diagnostics.warn(Warning::optional_phase_failed(format!(
                "{id}: optional phase {} failed: {}",
                spec.name, outcome.message
            )));
        }

        Ok(RunOutcome::Completed)
    }

    async fn invoke(
        &self,
        id: &DeploymentId,
        spec: &PhaseSpec,
        budget: Duration,
    ) -> (PhaseOutcome, i32) {
        let Some(handler) = self.handlers.get(spec.name) else {
            return (
                PhaseOutcome::failure(format!("no handler registered for {}", spec.name)),
                result_codes::FAILURE,
            );
        };

        let ctx = PhaseContext::new(
            id.clone(),
            spec.name,
            budget,
            Arc::clone(&self.registry),
            Arc::clone(&self.retry),
        );
        let task = tokio::spawn(async move { handler.handle(ctx).await });
        let abort = task.abort_handle();

        match tokio::time::timeout(budget, task).await {
            Ok(Ok(outcome)) => {
                let code = if outcome.success {
                    result_codes::SUCCESS
                } else {
                    result_codes::FAILURE
                };
                (outcome, code)
            }
            Ok(Err(e)) => (
                PhaseOutcome::failure(format!("{} handler aborted: {e}", spec.name)),
                result_codes::FAILURE,
            ),
            Err(_) => {
                abort.abort();
                (
                    PhaseOutcome::failure(format!(
                        "{} exceeded its timeout of {}s",
                        spec.name,
                        budget.as_secs()
                    )),
                    result_codes::TIMEOUT,
                )
            }
        }
    }

    fn finish(
        &self,
        id: &DeploymentId,
        spec: &PhaseSpec,
        outcome: &PhaseOutcome,
        execution_time: f64,
        budget: Duration,
        result_code: i32,
    ) -> Result<(), DeployError> {
        self.registry.finish_phase(
            id,
            spec.name,
            PhaseResult {
                success: outcome.success,
                message: outcome.message.clone(),
                execution_time,
                timeout_budget: budget.as_secs(),
                result_code,
            },
        )?;
        self.registry.recompute_progress(id)?;
        Ok(())
    }
}
