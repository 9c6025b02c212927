// ABOUTME: Generic phase handler that runs configured command steps in order.
// ABOUTME: Used for infrastructure, application, verification, and cleanup phases.

use async_trait::async_trait;
use std::collections::HashMap;

use super::env::phase_env;
use crate::deploy::{PhaseContext, PhaseHandler, PhaseOutcome};
use crate::retry::{ServiceClass, ShellCommand};

/// One command run through the retry controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub run: String,
    pub service: ServiceClass,
    /// Overrides the attempt budget derived from the service class.
    pub max_attempts: Option<u32>,
    pub env: HashMap<String, String>,
}

impl Step {
    pub fn new(name: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run: run.into(),
            service: ServiceClass::Generic,
            max_attempts: None,
            env: HashMap::new(),
        }
    }

    pub fn service(mut self, service: ServiceClass) -> Self {
        self.service = service;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Attempts for this step: explicit, else the service default, else the
    /// deployment's `retryAttempts` for generic steps.
    fn attempts(&self, retry_attempts: u32) -> u32 {
        match (self.max_attempts, self.service) {
            (Some(n), _) => n,
            (None, ServiceClass::Generic) => retry_attempts,
            (None, service) => service.default_max_attempts(),
        }
    }
}

/// Runs steps sequentially, reporting progress after each.
#[derive(Debug, Clone, Default)]
pub struct StepsHandler {
    steps: Vec<Step>,
}

impl StepsHandler {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

#[async_trait]
impl PhaseHandler for StepsHandler {
    async fn handle(&self, ctx: PhaseContext) -> PhaseOutcome {
        let phase = ctx.phase();
        if self.steps.is_empty() {
            ctx.report_progress(100, "no steps configured");
            return PhaseOutcome::success(format!("{phase}: no steps configured"));
        }

        let deployment = match ctx.deployment() {
            Ok(d) => d,
            Err(e) => return PhaseOutcome::failure(e.to_string()),
        };
        let options = ctx.options();
        let total = self.steps.len();

        for (index, step) in self.steps.iter().enumerate() {
            if ctx.is_cancelled() {
                return PhaseOutcome::failure(format!("interrupted before step {}", step.name));
            }

            if options.dry_run {
                tracing::info!(deployment = %deployment.id, %phase, step = %step.name, "dry run: skipping step");
            } else {
                let mut env = phase_env(&deployment, phase);
                env.extend(step.env.clone());
                let op = ShellCommand::new(&step.run).envs(env);
                let name = step.service.operation_name(&step.name);
                let attempts = step.attempts(options.retry_attempts);

                if let Err(e) = ctx.retry().execute(&name, attempts, &op).await {
                    return PhaseOutcome::failure(format!("step {} failed: {e}", step.name));
                }
            }

            let percent = ((index + 1) * 100 / total) as u8;
            ctx.report_progress(percent, format!("step {} done", step.name));
        }

        if options.dry_run {
            PhaseOutcome::success(format!("dry run: {total} step(s) skipped"))
        } else {
            PhaseOutcome::success(format!("{total} step(s) completed"))
        }
    }
}
