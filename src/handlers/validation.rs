// ABOUTME: Validation phase handler.
// ABOUTME: Checks stack name syntax, credentials, deployment type, and resource quota.

use async_trait::async_trait;
use std::str::FromStr;

use super::env::phase_env;
use crate::deploy::{PhaseContext, PhaseHandler, PhaseOutcome};
use crate::retry::ShellCommand;
use crate::types::{DeploymentType, StackName};

/// Pre-flight checks. Probe commands are optional; without one the probe is
/// skipped.
#[derive(Debug, Clone, Default)]
pub struct ValidationHandler {
    credentials_probe: Option<String>,
    quota_probe: Option<String>,
}

impl ValidationHandler {
    pub fn new(credentials_probe: Option<String>, quota_probe: Option<String>) -> Self {
        Self {
            credentials_probe,
            quota_probe,
        }
    }
}

#[async_trait]
impl PhaseHandler for ValidationHandler {
    async fn handle(&self, ctx: PhaseContext) -> PhaseOutcome {
        let deployment = match ctx.deployment() {
            Ok(d) => d,
            Err(e) => return PhaseOutcome::failure(e.to_string()),
        };
        let env = phase_env(&deployment, ctx.phase());

        if let Err(e) = StackName::new(&deployment.stack_name) {
            return PhaseOutcome::failure(format!("invalid stack name: {e}"));
        }
        ctx.report_progress(25, "stack name valid");

        match &self.credentials_probe {
            Some(probe) => {
                let op = ShellCommand::new(probe).envs(env.clone());
                if let Err(e) = ctx.retry().iam("validate-credentials", &op).await {
                    return PhaseOutcome::failure(format!("credential check failed: {e}"));
                }
                ctx.report_progress(50, "credentials valid");
            }
            None => {
                tracing::debug!(deployment = %deployment.id, "no credential probe configured");
                ctx.report_progress(50, "credential probe skipped");
            }
        }

        if let Err(e) = DeploymentType::from_str(&deployment.deployment_type) {
            return PhaseOutcome::failure(e.to_string());
        }
        ctx.report_progress(75, "deployment type valid");

        if let Some(probe) = &self.quota_probe {
            let op = ShellCommand::new(probe).envs(env);
            if let Err(e) = ctx.retry().ec2("check-quota", &op).await {
                return PhaseOutcome::failure(format!("quota check failed: {e}"));
            }
        }
        ctx.report_progress(100, "validation passed");

        PhaseOutcome::success("validation passed")
    }
}
