// ABOUTME: Concrete phase handlers driven by shell commands.
// ABOUTME: Builds the standard handler set from a resolved phase plan.

mod compensate;
mod env;
mod preparation;
mod steps;
mod validation;

pub use compensate::CommandCompensator;
pub use env::{ENV_PREFIX, deployment_env, phase_env};
pub use preparation::PreparationHandler;
pub use steps::{Step, StepsHandler};
pub use validation::ValidationHandler;

use crate::deploy::{HandlerSet, PhaseName};

/// Commands for every phase, with environment values already resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhasePlan {
    pub credentials_probe: Option<String>,
    pub quota_probe: Option<String>,
    pub backup_command: Option<String>,
    pub infrastructure: Vec<Step>,
    pub application: Vec<Step>,
    pub verification: Vec<Step>,
    pub cleanup: Vec<Step>,
}

/// Handlers for all six standard phases.
pub fn standard(plan: PhasePlan) -> HandlerSet {
    HandlerSet::new()
        .with(
            PhaseName::Validation,
            ValidationHandler::new(plan.credentials_probe, plan.quota_probe),
        )
        .with(
            PhaseName::Preparation,
            PreparationHandler::new(plan.backup_command),
        )
        .with(
            PhaseName::Infrastructure,
            StepsHandler::new(plan.infrastructure),
        )
        .with(PhaseName::Application, StepsHandler::new(plan.application))
        .with(PhaseName::Verification, StepsHandler::new(plan.verification))
        .with(PhaseName::Cleanup, StepsHandler::new(plan.cleanup))
}
